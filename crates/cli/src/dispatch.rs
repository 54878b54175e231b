// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent fan-out of one worker per account, joined at a barrier.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::PullError;
use crate::session::{CredentialBatch, SessionCredential};

/// Runs a worker per account and collects every result before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrentDispatcher {
    limit: Option<NonZeroUsize>,
}

impl ConcurrentDispatcher {
    /// `None` gives every account its own concurrent worker.
    pub fn new(limit: Option<NonZeroUsize>) -> Self {
        Self { limit }
    }

    /// Effective fan-out width for `accounts` accounts.
    pub fn width(&self, accounts: usize) -> usize {
        let width = self.limit.map_or(accounts, |l| l.get().min(accounts));
        width.max(1)
    }

    /// Dispatch `worker` for each account and wait for all of them.
    ///
    /// A worker error, panic, or external abort stops the remaining workers
    /// and returns no batch.
    pub async fn run<F, Fut>(
        &self,
        accounts: &[String],
        cancel: &CancellationToken,
        worker: F,
    ) -> Result<CredentialBatch, PullError>
    where
        F: Fn(String, CancellationToken) -> Fut,
        Fut: Future<Output = Result<SessionCredential, PullError>> + Send + 'static,
    {
        let width = self.width(accounts.len());
        let permits = Arc::new(Semaphore::new(width));
        let abort = cancel.child_token();
        tracing::info!(accounts = accounts.len(), width, "dispatching session workers");

        let mut aborts = Vec::with_capacity(accounts.len());
        let mut pending = FuturesUnordered::new();
        for account in accounts {
            let permits = Arc::clone(&permits);
            let fut = worker(account.clone(), abort.clone());
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await;
                fut.await
            });
            aborts.push(handle.abort_handle());
            let account = account.clone();
            pending.push(async move { (account, handle.await) });
        }

        let mut results: HashMap<String, SessionCredential> = HashMap::with_capacity(accounts.len());
        let mut failure: Option<PullError> = None;
        while let Some((account, joined)) = pending.next().await {
            let err = match joined {
                Ok(Ok(cred)) => {
                    results.insert(account, cred);
                    continue;
                }
                Ok(Err(e)) => e,
                // Aborted by us after an earlier failure.
                Err(e) if e.is_cancelled() && failure.is_some() => continue,
                Err(e) => PullError::DispatchAborted {
                    account: account.clone(),
                    reason: if e.is_panic() { "worker panicked".to_owned() } else { e.to_string() },
                },
            };
            if failure.is_none() {
                tracing::error!(account = %account, err = %err, "worker failed, aborting remaining workers");
                abort.cancel();
                for handle in &aborts {
                    handle.abort();
                }
                failure = Some(err);
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        let mut entries = IndexMap::with_capacity(accounts.len());
        for account in accounts {
            let Some(mut cred) = results.remove(account) else {
                return Err(PullError::DispatchAborted {
                    account: account.clone(),
                    reason: "no result collected".to_owned(),
                });
            };
            cred.account_id = account.clone();
            entries.insert(account.clone(), cred);
        }
        Ok(CredentialBatch::from_entries(entries))
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
