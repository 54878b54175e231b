// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the credential broker's roles and sessions endpoints.

use std::sync::Once;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::AuthContext;
use crate::error::PullError;

/// Redirect hops followed before a request fails as a redirect loop.
const MAX_REDIRECTS: usize = 10;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// One assumable role as advertised by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// `GET <roles_url>` response body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RolesResponse {
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    /// A list of entries, or a single bare string.
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

/// `POST <sessions_url>` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub duration_hours: String,
    pub role_id: String,
    pub reason: String,
}

/// `POST <sessions_url>` response body. Any level may be missing.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SessionResponse {
    #[serde(default)]
    pub session: Option<SessionBody>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SessionBody {
    #[serde(default)]
    pub credentials: Option<CredentialPayload>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CredentialPayload {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

impl SessionResponse {
    /// The key pair, if both halves are present and non-empty.
    pub fn key_pair(&self) -> Option<(&str, &str)> {
        let creds = self.session.as_ref()?.credentials.as_ref()?;
        let key = creds.access_key_id.as_deref().filter(|s| !s.is_empty())?;
        let secret = creds.secret_access_key.as_deref().filter(|s| !s.is_empty())?;
        Some((key, secret))
    }
}

fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

/// Client for both broker endpoints.
pub struct BrokerClient {
    roles_url: String,
    sessions_url: String,
    client: Client,
}

impl BrokerClient {
    pub fn new(roles_url: impl Into<String>, sessions_url: impl Into<String>, timeout: Duration) -> Self {
        ensure_crypto();
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .unwrap_or_default();
        Self { roles_url: roles_url.into(), sessions_url: sessions_url.into(), client }
    }

    pub fn roles_url(&self) -> &str {
        &self.roles_url
    }

    /// Fetch the raw role catalog.
    pub async fn get_roles(&self, ctx: &AuthContext) -> Result<RolesResponse, PullError> {
        let req = ctx.apply(self.client.get(&self.roles_url));
        self.send_json(&self.roles_url, req).await
    }

    /// Request one session. The body is returned as-is, empty or not.
    pub async fn create_session(
        &self,
        ctx: &AuthContext,
        body: &SessionRequest,
    ) -> Result<SessionResponse, PullError> {
        let req = ctx.apply(self.client.post(&self.sessions_url)).json(body);
        self.send_json(&self.sessions_url, req).await
    }

    /// Send and decode a JSON body regardless of HTTP status; the broker
    /// reports application errors inside the payload.
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<T, PullError> {
        let resp = req.send().await.map_err(|e| PullError::from_transport(url, &e))?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| PullError::from_transport(url, &e))?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => {
                Err(PullError::BrokerError(format!("undecodable response from {url}: {e}")))
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&bytes);
                Err(PullError::BrokerError(format!("HTTP {status} from {url}: {text}")))
            }
        }
    }
}
