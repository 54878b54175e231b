// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role discovery and name filtering.

use std::collections::HashSet;

use crate::auth::AuthContext;
use crate::broker::{BrokerClient, Role, RolesResponse};
use crate::error::PullError;

/// Error string the broker places in `errors` when it rejects the operator.
pub const AUTH_FAILURE_MARKER: &str = "Authentication failure";

/// Account ids selected for a run, in catalog order.
pub type AccountSet = Vec<String>;

/// Fetch every role the operator may assume.
pub async fn fetch(broker: &BrokerClient, ctx: &AuthContext) -> Result<Vec<Role>, PullError> {
    let body = broker.get_roles(ctx).await?;
    roles_from_response(body)
}

/// Interpret a catalog body: authentication errors win over any roles present.
pub fn roles_from_response(body: RolesResponse) -> Result<Vec<Role>, PullError> {
    let errors = error_entries(body.errors);
    if errors.iter().any(signals_auth_failure) {
        return Err(PullError::AuthenticationFailure);
    }
    match body.roles {
        Some(roles) => Ok(roles),
        None if errors.is_empty() => {
            Err(PullError::BrokerError("catalog response has no roles".to_owned()))
        }
        None => {
            let joined = errors.iter().map(error_text).collect::<Vec<_>>().join("; ");
            Err(PullError::BrokerError(joined))
        }
    }
}

fn error_entries(errors: Option<serde_json::Value>) -> Vec<serde_json::Value> {
    match errors {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(entries)) => entries,
        Some(other) => vec![other],
    }
}

fn signals_auth_failure(entry: &serde_json::Value) -> bool {
    match entry {
        serde_json::Value::String(s) => s.contains(AUTH_FAILURE_MARKER),
        serde_json::Value::Object(map) => map.values().any(signals_auth_failure),
        _ => false,
    }
}

fn error_text(entry: &serde_json::Value) -> String {
    match entry {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Select the ids of roles whose name contains `substring`.
pub fn filter(roles: &[Role], substring: &str) -> Result<AccountSet, PullError> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();
    for role in roles.iter().filter(|r| r.name.contains(substring)) {
        if !seen.insert(role.id.as_str()) {
            tracing::warn!(account = %role.id, name = %role.name, "duplicate role id in catalog, skipping");
            continue;
        }
        accounts.push(role.id.clone());
    }
    if accounts.is_empty() {
        return Err(PullError::NoMatchingAccounts(substring.to_owned()));
    }
    Ok(accounts)
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
