// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::session::RetryPolicy;

/// Longest session the broker will grant, in hours.
pub const MAX_SESSION_HOURS: u32 = 36;

pub const DEFAULT_ROLES_URL: &str = "https://cloudgateway.pgi.com/api/aws/roles";
pub const DEFAULT_SESSIONS_URL: &str = "https://cloudgateway.pgi.com/api/aws/sessions";

/// Pull temporary AWS keys for every matching broker role into named profiles.
#[derive(Debug, Parser)]
#[command(name = "gatekeys", version, about)]
pub struct Config {
    /// Operator domain (pass together with USERNAME and PASSWORD).
    pub domain: Option<String>,

    /// Operator username.
    pub username: Option<String>,

    /// Operator password.
    pub password: Option<String>,

    /// Operator identity as DOMAIN\username, used when no positional args are given.
    #[arg(long = "user", env = "GATEKEYS_USERNAME")]
    pub env_username: Option<String>,

    /// Operator password, used when no positional args are given.
    #[arg(long = "pass", env = "GATEKEYS_PASSWORD", hide_env_values = true)]
    pub env_password: Option<String>,

    /// Only pull roles whose name contains this substring (case-sensitive).
    #[arg(long, env = "GATEKEYS_FILTER", default_value = "Ops")]
    pub filter: String,

    /// Broker endpoint listing assumable roles.
    #[arg(long, env = "GATEKEYS_ROLES_URL", default_value = DEFAULT_ROLES_URL)]
    pub roles_url: String,

    /// Broker endpoint issuing sessions.
    #[arg(long, env = "GATEKEYS_SESSIONS_URL", default_value = DEFAULT_SESSIONS_URL)]
    pub sessions_url: String,

    /// Requested session lifetime in hours (broker maximum is 36).
    #[arg(long, env = "GATEKEYS_HOURS", default_value_t = MAX_SESSION_HOURS)]
    pub hours: u32,

    /// Audit annotation sent with every session request.
    #[arg(long, env = "GATEKEYS_REASON", default_value = "Daily backup of keys")]
    pub reason: String,

    /// Maximum concurrent session requests (defaults to one per account).
    #[arg(long, env = "GATEKEYS_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Give up on an account after this many session requests (default: never).
    #[arg(long, env = "GATEKEYS_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Pause between session retries in milliseconds.
    #[arg(long, env = "GATEKEYS_RETRY_BACKOFF_MS", default_value_t = 0)]
    pub retry_backoff_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "GATEKEYS_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Cancel the whole run after this many seconds.
    #[arg(long, env = "GATEKEYS_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Executable used to write profiles.
    #[arg(long, env = "GATEKEYS_AWS_BIN", default_value = "aws")]
    pub aws_bin: PathBuf,

    /// Log format (json or text).
    #[arg(long, env = "GATEKEYS_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "GATEKEYS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Reject configurations that cannot run.
    pub fn validate(&self) -> anyhow::Result<()> {
        let positional =
            [&self.domain, &self.username, &self.password].iter().filter(|v| v.is_some()).count();
        if positional != 0 && positional != 3 {
            anyhow::bail!("expected DOMAIN USERNAME PASSWORD together, got {positional} of 3");
        }
        if self.hours == 0 || self.hours > MAX_SESSION_HOURS {
            anyhow::bail!("--hours must be between 1 and {MAX_SESSION_HOURS}, got {}", self.hours);
        }
        if self.filter.is_empty() {
            anyhow::bail!("--filter must not be empty");
        }
        if self.roles_url.trim().is_empty() || self.sessions_url.trim().is_empty() {
            anyhow::bail!("--roles-url and --sessions-url must not be empty");
        }
        if self.concurrency == Some(0) {
            anyhow::bail!("--concurrency must be at least 1");
        }
        if self.max_attempts == Some(0) {
            anyhow::bail!("--max-attempts must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("--request-timeout-secs must be at least 1");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn concurrency_limit(&self) -> Option<NonZeroUsize> {
        self.concurrency.and_then(NonZeroUsize::new)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
