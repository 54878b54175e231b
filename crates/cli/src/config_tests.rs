// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::{Config, MAX_SESSION_HOURS};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn defaults_match_daily_backup() -> anyhow::Result<()> {
    let config = parse(&["gatekeys"]);
    config.validate()?;
    assert_eq!(config.hours, MAX_SESSION_HOURS);
    assert_eq!(config.reason, "Daily backup of keys");
    assert_eq!(config.aws_bin.to_str(), Some("aws"));
    assert_eq!(config.concurrency_limit(), None);
    Ok(())
}

#[test]
fn positional_credentials() -> anyhow::Result<()> {
    let config = parse(&["gatekeys", "EUROPE", "cvs", "secret"]);
    config.validate()?;
    assert_eq!(config.domain.as_deref(), Some("EUROPE"));
    assert_eq!(config.username.as_deref(), Some("cvs"));
    assert_eq!(config.password.as_deref(), Some("secret"));
    Ok(())
}

#[test]
fn retry_policy_defaults_to_unbounded() {
    let policy = parse(&["gatekeys"]).retry_policy();
    assert_eq!(policy.max_attempts, None);
    assert_eq!(policy.backoff, Duration::ZERO);
}

#[test]
fn retry_policy_from_flags() {
    let config = parse(&["gatekeys", "--max-attempts", "5", "--retry-backoff-ms", "250"]);
    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts, Some(5));
    assert_eq!(policy.backoff, Duration::from_millis(250));
}

#[test]
fn deadline_and_timeout() {
    let config = parse(&["gatekeys", "--deadline-secs", "90", "--request-timeout-secs", "7"]);
    assert_eq!(config.deadline(), Some(Duration::from_secs(90)));
    assert_eq!(config.request_timeout(), Duration::from_secs(7));
}

#[yare::parameterized(
    partial_positional = { &["gatekeys", "EUROPE", "cvs"], "DOMAIN USERNAME PASSWORD" },
    zero_hours         = { &["gatekeys", "--hours", "0"], "--hours" },
    over_broker_cap    = { &["gatekeys", "--hours", "37"], "--hours" },
    empty_filter       = { &["gatekeys", "--filter", ""], "--filter" },
    zero_concurrency   = { &["gatekeys", "--concurrency", "0"], "--concurrency" },
    zero_attempts      = { &["gatekeys", "--max-attempts", "0"], "--max-attempts" },
    zero_timeout       = { &["gatekeys", "--request-timeout-secs", "0"], "--request-timeout-secs" },
    bad_log_format     = { &["gatekeys", "--log-format", "xml"], "invalid log format" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}
