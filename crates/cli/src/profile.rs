// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile write-back: store each account's key pair as a named profile.
//!
//! Writes are strictly serial. The store is a shared, non-transactional
//! resource, so the configurator only runs after every session is in hand.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use crate::error::PullError;
use crate::session::{CredentialBatch, SessionCredential};

pub const ACCESS_KEY_SETTING: &str = "aws_access_key_id";
pub const SECRET_KEY_SETTING: &str = "aws_secret_access_key";

/// A named-profile credential store.
pub trait ProfileStore: Send + Sync {
    /// Verify the store is usable before anything else runs.
    fn check(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Set one `key = value` entry on `profile`.
    fn set<'a>(
        &'a self,
        profile: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

/// Store backed by `aws configure set`.
pub struct AwsCliStore {
    program: PathBuf,
}

impl AwsCliStore {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());
        cmd
    }
}

impl ProfileStore for AwsCliStore {
    fn check(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let program = self.program.display();
            match self.command().arg("--version").output().await {
                Ok(out) if out.status.success() => Ok(()),
                Ok(out) => anyhow::bail!("`{program} --version` exited with {}", out.status),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    anyhow::bail!("{program} is not installed or not in PATH")
                }
                Err(e) => Err(anyhow::Error::new(e).context(format!("failed to run {program}"))),
            }
        })
    }

    fn set<'a>(
        &'a self,
        profile: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let out = self
                .command()
                .args(["configure", "set", key, value, "--profile", profile])
                .output()
                .await?;
            if !out.status.success() {
                let stderr = String::from_utf8_lossy(&out.stderr);
                anyhow::bail!("configure set {key} exited with {}: {}", out.status, stderr.trim());
            }
            Ok(())
        })
    }
}

/// Outcome of the write-back pass, in account order.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub outcomes: Vec<(String, Result<(), PullError>)>,
}

impl WriteReport {
    pub fn configured(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PullError)> {
        self.outcomes.iter().filter_map(|(a, r)| r.as_ref().err().map(|e| (a.as_str(), e)))
    }

    pub fn outcome(&self, account: &str) -> Option<&Result<(), PullError>> {
        self.outcomes.iter().find(|(a, _)| a == account).map(|(_, r)| r)
    }
}

/// Writes session credentials into a [`ProfileStore`].
pub struct ProfileConfigurator<'s> {
    store: &'s dyn ProfileStore,
}

impl<'s> ProfileConfigurator<'s> {
    pub fn new(store: &'s dyn ProfileStore) -> Self {
        Self { store }
    }

    /// Preflight: fail with `ToolingMissing` if the store cannot be used.
    pub async fn preflight(&self) -> Result<(), PullError> {
        self.store.check().await.map_err(|e| PullError::ToolingMissing(format!("{e:#}")))
    }

    /// Write key and secret for one account into the profile named after it.
    pub async fn apply(
        &self,
        account_id: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<(), PullError> {
        let write_err = |e: anyhow::Error| PullError::ProfileWriteError {
            account: account_id.to_owned(),
            reason: format!("{e:#}"),
        };
        self.store.set(account_id, ACCESS_KEY_SETTING, access_key_id).await.map_err(write_err)?;
        self.store
            .set(account_id, SECRET_KEY_SETTING, secret_access_key)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Write every credential in order. A failed account is recorded and the
    /// pass continues.
    pub async fn apply_all(&self, batch: &CredentialBatch) -> WriteReport {
        let mut report = WriteReport::default();
        for cred in batch.iter() {
            let result = self.apply_credential(cred).await;
            match &result {
                Ok(()) => tracing::info!(account = %cred.account_id, "profile configured"),
                Err(e) => tracing::warn!(account = %cred.account_id, err = %e, "profile write failed"),
            }
            report.outcomes.push((cred.account_id.clone(), result));
        }
        report
    }

    async fn apply_credential(&self, cred: &SessionCredential) -> Result<(), PullError> {
        self.apply(&cred.account_id, &cred.access_key_id, &cred.secret_access_key).await
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
