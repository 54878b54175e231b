// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account session acquisition with retry-until-non-empty.
//!
//! The broker sometimes answers a session request with an empty credential
//! body even though the request succeeded. The acquirer re-issues the same
//! request until it gets a key pair. Transport failures are treated the same
//! way. Under the default [`RetryPolicy`] nothing bounds this loop: a broker
//! that never yields keys hangs the worker until the caller cancels it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthContext;
use crate::broker::{BrokerClient, SessionRequest};
use crate::error::PullError;

/// Temporary key pair issued for one account.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Credentials keyed by account, iterated in account-set order.
#[derive(Debug, Default)]
pub struct CredentialBatch {
    entries: IndexMap<String, SessionCredential>,
}

impl CredentialBatch {
    pub(crate) fn from_entries(entries: IndexMap<String, SessionCredential>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, account_id: &str) -> Option<&SessionCredential> {
        self.entries.get(account_id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionCredential> {
        self.entries.values()
    }
}

/// How hard to keep asking for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Requests per account before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Retry forever with no pause.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Requests sessions for individual accounts.
pub struct SessionAcquirer {
    broker: Arc<BrokerClient>,
    ctx: Arc<AuthContext>,
    duration_hours: u32,
    reason: String,
    policy: RetryPolicy,
}

impl SessionAcquirer {
    pub fn new(
        broker: Arc<BrokerClient>,
        ctx: Arc<AuthContext>,
        duration_hours: u32,
        reason: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self { broker, ctx, duration_hours, reason: reason.into(), policy }
    }

    /// Request a session for `account_id` until the broker returns a key pair.
    pub async fn acquire(
        &self,
        account_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SessionCredential, PullError> {
        let body = SessionRequest {
            duration_hours: self.duration_hours.to_string(),
            role_id: account_id.to_owned(),
            reason: self.reason.clone(),
        };
        let cancelled = || PullError::Cancelled { account: account_id.to_owned() };

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                r = self.broker.create_session(&self.ctx, &body) => r,
            };

            match outcome {
                Ok(resp) => {
                    if let Some((key, secret)) = resp.key_pair() {
                        tracing::info!(account = account_id, attempts, "retrieved session keys");
                        return Ok(SessionCredential {
                            account_id: account_id.to_owned(),
                            access_key_id: key.to_owned(),
                            secret_access_key: secret.to_owned(),
                        });
                    }
                    tracing::warn!(account = account_id, attempt = attempts, "got nothing, retrying");
                }
                Err(e) => {
                    tracing::warn!(
                        account = account_id,
                        attempt = attempts,
                        code = e.as_code(),
                        err = %e,
                        "session request failed, retrying"
                    );
                }
            }

            if self.policy.exhausted(attempts) {
                return Err(PullError::RetriesExhausted { account: account_id.to_owned(), attempts });
            }
            if !self.policy.backoff.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.backoff) => {}
                    _ = cancel.cancelled() => return Err(cancelled()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
