// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gatekeys: bulk-provision temporary AWS keys from a credential broker.

pub mod auth;
pub mod broker;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod operator;
pub mod pipeline;
pub mod profile;
pub mod session;
#[cfg(test)]
pub mod test_support;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::broker::BrokerClient;
use crate::config::Config;
use crate::dispatch::ConcurrentDispatcher;
use crate::error::PipelineError;
use crate::operator::OperatorSource;
use crate::pipeline::{Pipeline, PipelineSettings, RunSummary};
use crate::profile::AwsCliStore;

/// Exit code when every requested profile was written.
pub const EXIT_OK: i32 = 0;
/// Exit code for a fatal error before any profile was touched.
pub const EXIT_FATAL: i32 = 1;
/// Exit code for invalid configuration.
pub const EXIT_USAGE: i32 = 2;
/// Exit code when some, but not all, profiles were written.
pub const EXIT_PARTIAL: i32 = 3;
/// Exit code when no profile could be written.
pub const EXIT_NONE_CONFIGURED: i32 = 4;

/// Map a finished run onto the process exit code.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.is_complete() {
        EXIT_OK
    } else if summary.configured == 0 {
        EXIT_NONE_CONFIGURED
    } else {
        EXIT_PARTIAL
    }
}

/// Map a failed run onto the process exit code.
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(e) if !e.source.is_fatal() => EXIT_NONE_CONFIGURED,
        _ => EXIT_FATAL,
    }
}

/// Build the pipeline from config and run it against the `aws` CLI store.
pub async fn run(config: Config, cancel: CancellationToken) -> anyhow::Result<RunSummary> {
    let broker = BrokerClient::new(
        config.roles_url.clone(),
        config.sessions_url.clone(),
        config.request_timeout(),
    );
    let store = Arc::new(AwsCliStore::new(config.aws_bin.clone()));
    let settings = PipelineSettings {
        filter: config.filter.clone(),
        duration_hours: config.hours,
        reason: config.reason.clone(),
        retry: config.retry_policy(),
        dispatcher: ConcurrentDispatcher::new(config.concurrency_limit()),
    };
    if settings.retry.max_attempts.is_none() {
        tracing::debug!("session retries are unbounded; use --max-attempts or --deadline-secs to cap them");
    }

    let source = OperatorSource::from_config(&config);
    let pipeline = Pipeline::new(broker, store, settings);
    let summary = pipeline.run(move || source.resolve(), &cancel).await?;
    Ok(summary)
}
