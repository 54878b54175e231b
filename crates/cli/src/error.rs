// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failures raised anywhere in the credential pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PullError {
    #[error("profile store tooling missing: {0}")]
    ToolingMissing(String),

    #[error("could not resolve operator credentials: {0}")]
    OperatorInput(String),

    #[error("invalid username or password")]
    AuthenticationFailure,

    #[error("broker unreachable at {url}: {reason}")]
    BrokerUnreachable { url: String, reason: String },

    #[error("too many redirects, check {url}")]
    TooManyRedirects { url: String },

    #[error("broker error: {0}")]
    BrokerError(String),

    #[error("could not find any accounts matching \"{0}\"")]
    NoMatchingAccounts(String),

    #[error("gave up on account {account} after {attempts} attempts")]
    RetriesExhausted { account: String, attempts: u32 },

    #[error("session acquisition for {account} cancelled")]
    Cancelled { account: String },

    #[error("worker for {account} aborted: {reason}")]
    DispatchAborted { account: String, reason: String },

    #[error("failed to write profile {account}: {reason}")]
    ProfileWriteError { account: String, reason: String },
}

impl PullError {
    /// Stable machine-readable code for logs.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::ToolingMissing(_) => "TOOLING_MISSING",
            Self::OperatorInput(_) => "OPERATOR_INPUT",
            Self::AuthenticationFailure => "AUTHENTICATION_FAILURE",
            Self::BrokerUnreachable { .. } => "BROKER_UNREACHABLE",
            Self::TooManyRedirects { .. } => "TOO_MANY_REDIRECTS",
            Self::BrokerError(_) => "BROKER_ERROR",
            Self::NoMatchingAccounts(_) => "NO_MATCHING_ACCOUNTS",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::Cancelled { .. } => "CANCELLED",
            Self::DispatchAborted { .. } => "DISPATCH_ABORTED",
            Self::ProfileWriteError { .. } => "PROFILE_WRITE_ERROR",
        }
    }

    /// Whether this error ends the run once it escapes a pipeline stage.
    /// A failed profile write only costs that account. Transport errors met
    /// while acquiring sessions are retried by the acquirer and never get here.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ProfileWriteError { .. })
    }

    /// Classify a reqwest failure against the URL it was sent to.
    pub fn from_transport(url: &str, err: &reqwest::Error) -> Self {
        if err.is_redirect() {
            Self::TooManyRedirects { url: url.to_owned() }
        } else if err.is_timeout() {
            Self::BrokerUnreachable { url: url.to_owned(), reason: "timed out".to_owned() }
        } else if err.is_connect() {
            Self::BrokerUnreachable { url: url.to_owned(), reason: err.to_string() }
        } else {
            Self::BrokerError(err.to_string())
        }
    }
}

/// Pipeline stages, in the order a run passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    PreflightCheck,
    AuthResolved,
    CatalogFetched,
    AccountsFiltered,
    SessionsAcquired,
    ProfilesWritten,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PreflightCheck => "preflight_check",
            Self::AuthResolved => "auth_resolved",
            Self::CatalogFetched => "catalog_fetched",
            Self::AccountsFiltered => "accounts_filtered",
            Self::SessionsAcquired => "sessions_acquired",
            Self::ProfilesWritten => "profiles_written",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal pipeline failure, tagged with the stage that could not be reached.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: PullError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: PullError) -> Self {
        Self { stage, source }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
