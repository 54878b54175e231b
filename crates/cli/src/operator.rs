// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolve operator credentials from arguments, environment, or a prompt.

use crate::auth::AuthContext;
use crate::config::Config;

/// Where the operator's username and password came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorSource {
    /// `DOMAIN USERNAME PASSWORD` positional arguments.
    Arguments { domain: String, username: String, password: String },
    /// Username and password from the environment.
    Environment { identity: String, password: String },
    /// Ask on the terminal.
    Prompt,
}

impl OperatorSource {
    pub fn from_config(config: &Config) -> Self {
        if let (Some(domain), Some(username), Some(password)) =
            (&config.domain, &config.username, &config.password)
        {
            return Self::Arguments {
                domain: domain.clone(),
                username: username.clone(),
                password: password.clone(),
            };
        }
        if let (Some(identity), Some(password)) = (&config.env_username, &config.env_password) {
            return Self::Environment { identity: identity.clone(), password: password.clone() };
        }
        Self::Prompt
    }

    /// Build the auth context, prompting if needed.
    pub fn resolve(self) -> anyhow::Result<AuthContext> {
        match self {
            Self::Arguments { domain, username, password } => {
                Ok(AuthContext::new(qualified_identity(&domain, &username), password))
            }
            Self::Environment { identity, password } => Ok(AuthContext::new(identity, password)),
            Self::Prompt => prompt(),
        }
    }
}

/// `DOMAIN\username`, the form the broker expects.
pub fn qualified_identity(domain: &str, username: &str) -> String {
    format!("{domain}\\{username}")
}

/// Logged-in user on Windows, as `USERDOMAIN\USERNAME`.
pub fn platform_default_identity() -> Option<String> {
    if !cfg!(windows) {
        return None;
    }
    let domain = std::env::var("USERDOMAIN").ok()?;
    let username = std::env::var("USERNAME").ok()?;
    Some(qualified_identity(&domain, &username))
}

fn prompt() -> anyhow::Result<AuthContext> {
    use anyhow::Context;
    use dialoguer::{Input, Password};

    let mut input = Input::<String>::new().with_prompt("Username (DOMAIN\\UserName)");
    if let Some(default) = platform_default_identity() {
        input = input.default(default);
    }
    let identity = input.interact_text().context("failed to read username")?;
    let password = Password::new()
        .with_prompt("Enter password")
        .interact()
        .context("failed to read password")?;
    Ok(AuthContext::new(identity.trim(), password))
}
