// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end run: preflight, auth, discovery, acquisition, write-back.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::AuthContext;
use crate::broker::BrokerClient;
use crate::catalog;
use crate::dispatch::ConcurrentDispatcher;
use crate::error::{PipelineError, PullError, Stage};
use crate::profile::{ProfileConfigurator, ProfileStore};
use crate::session::{RetryPolicy, SessionAcquirer};

/// Per-run settings that shape discovery and acquisition.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub filter: String,
    pub duration_hours: u32,
    pub reason: String,
    pub retry: RetryPolicy,
    pub dispatcher: ConcurrentDispatcher,
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Accounts that matched the filter.
    pub requested: usize,
    /// Accounts whose profile was fully written.
    pub configured: usize,
    /// `(account, reason)` for each failed write.
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.configured == self.requested
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(f, "{} profiles configured", self.configured)
        } else {
            write!(f, "{} of {} profiles configured", self.configured, self.requested)
        }
    }
}

/// Wires catalog, acquirer, dispatcher, and configurator together.
pub struct Pipeline {
    broker: Arc<BrokerClient>,
    store: Arc<dyn ProfileStore>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(broker: BrokerClient, store: Arc<dyn ProfileStore>, settings: PipelineSettings) -> Self {
        Self { broker: Arc::new(broker), store, settings }
    }

    /// Run every stage. `resolve` produces the operator's credentials once
    /// the store has passed its preflight check. It may block on the terminal,
    /// so it runs on the blocking pool.
    pub async fn run<R>(&self, resolve: R, cancel: &CancellationToken) -> Result<RunSummary, PipelineError>
    where
        R: FnOnce() -> anyhow::Result<AuthContext> + Send + 'static,
    {
        let configurator = ProfileConfigurator::new(self.store.as_ref());
        enter(Stage::Init);

        configurator.preflight().await.map_err(|e| PipelineError::new(Stage::PreflightCheck, e))?;
        enter(Stage::PreflightCheck);

        let ctx = match tokio::task::spawn_blocking(resolve).await {
            Ok(Ok(ctx)) => Arc::new(ctx),
            Ok(Err(e)) => {
                return Err(PipelineError::new(Stage::AuthResolved, PullError::OperatorInput(format!("{e:#}"))));
            }
            Err(e) => {
                return Err(PipelineError::new(Stage::AuthResolved, PullError::OperatorInput(e.to_string())));
            }
        };
        enter(Stage::AuthResolved);
        tracing::info!(identity = ctx.identity(), broker = self.broker.roles_url(), "connecting to broker");

        let roles = catalog::fetch(&self.broker, &ctx)
            .await
            .map_err(|e| PipelineError::new(Stage::CatalogFetched, e))?;
        enter(Stage::CatalogFetched);
        tracing::debug!(roles = roles.len(), "catalog fetched");

        let accounts = catalog::filter(&roles, &self.settings.filter)
            .map_err(|e| PipelineError::new(Stage::AccountsFiltered, e))?;
        enter(Stage::AccountsFiltered);
        tracing::info!(filter = %self.settings.filter, accounts = ?accounts, "accounts selected");

        let acquirer = Arc::new(SessionAcquirer::new(
            Arc::clone(&self.broker),
            Arc::clone(&ctx),
            self.settings.duration_hours,
            self.settings.reason.clone(),
            self.settings.retry,
        ));
        let batch = self
            .settings
            .dispatcher
            .run(&accounts, cancel, |account, token| {
                let acquirer = Arc::clone(&acquirer);
                async move { acquirer.acquire(&account, &token).await }
            })
            .await
            .map_err(|e| PipelineError::new(Stage::SessionsAcquired, e))?;
        enter(Stage::SessionsAcquired);

        let report = configurator.apply_all(&batch).await;
        enter(Stage::ProfilesWritten);

        let summary = RunSummary {
            requested: accounts.len(),
            configured: report.configured(),
            failures: report.failures().map(|(a, e)| (a.to_owned(), e.to_string())).collect(),
        };
        enter(Stage::Done);
        Ok(summary)
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "stage reached");
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
