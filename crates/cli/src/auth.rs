// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator identity attached to every broker request.

use std::fmt;

pub const USERNAME_HEADER: &str = "CloudGateway-Username";
pub const PASSWORD_HEADER: &str = "CloudGateway-Password";
pub const ACCEPT_MEDIA_TYPE: &str = "application/vnd.cloudgateway.v1+json";

/// Immutable operator credentials. Built once, then shared by reference.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    identity: String,
    secret: String,
}

impl AuthContext {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { identity: identity.into(), secret: secret.into() }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Attach identity, secret, and content negotiation headers.
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(USERNAME_HEADER, &self.identity)
            .header(PASSWORD_HEADER, &self.secret)
            .header(reqwest::header::ACCEPT, ACCEPT_MEDIA_TYPE)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::AuthContext;

    #[test]
    fn debug_redacts_secret() {
        let ctx = AuthContext::new("EUROPE\\ops", "hunter2");
        let out = format!("{ctx:?}");
        assert!(out.contains("EUROPE\\\\ops"));
        assert!(!out.contains("hunter2"));
    }
}
