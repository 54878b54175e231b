// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures: a mock broker and an in-memory profile store.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{AuthContext, USERNAME_HEADER};
use crate::broker::BrokerClient;
use crate::profile::ProfileStore;

/// Assert that `$expr` is an `Err` whose message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

pub fn test_ctx() -> AuthContext {
    AuthContext::new("EUROPE\\ops", "hunter2")
}

/// Behavior of the mock broker.
pub struct MockBrokerSpec {
    /// Status and body served for the role catalog.
    pub roles: (u16, serde_json::Value),
    /// Session requests answered with an empty payload before real keys flow.
    pub empty_replies: u32,
}

impl MockBrokerSpec {
    pub fn with_roles(roles: serde_json::Value) -> Self {
        Self { roles: (200, json!({ "roles": roles, "errors": [] })), empty_replies: 0 }
    }
}

/// A running mock broker and its request counters.
pub struct MockBroker {
    pub addr: std::net::SocketAddr,
    pub roles_calls: Arc<AtomicU32>,
    pub session_calls: Arc<AtomicU32>,
    /// `role_id`s in the order session requests arrived.
    pub session_roles: Arc<Mutex<Vec<String>>>,
    /// Username header of every request received.
    pub usernames: Arc<Mutex<Vec<String>>>,
}

impl MockBroker {
    pub async fn spawn(spec: MockBrokerSpec) -> Self {
        let roles_calls = Arc::new(AtomicU32::new(0));
        let session_calls = Arc::new(AtomicU32::new(0));
        let session_roles = Arc::new(Mutex::new(Vec::new()));
        let usernames = Arc::new(Mutex::new(Vec::new()));

        let (status, roles_body) = spec.roles;
        let empty_replies = spec.empty_replies;

        let rc = Arc::clone(&roles_calls);
        let ru = Arc::clone(&usernames);
        let sc = Arc::clone(&session_calls);
        let sr = Arc::clone(&session_roles);
        let su = Arc::clone(&usernames);

        let app = Router::new()
            .route(
                "/roles",
                get(move |headers: HeaderMap| {
                    let rc = Arc::clone(&rc);
                    let ru = Arc::clone(&ru);
                    let body = roles_body.clone();
                    async move {
                        rc.fetch_add(1, Ordering::Relaxed);
                        record_username(&ru, &headers);
                        let status =
                            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                        (status, Json(body))
                    }
                }),
            )
            .route(
                "/sessions",
                post(move |headers: HeaderMap, Json(req): Json<serde_json::Value>| {
                    let sc = Arc::clone(&sc);
                    let sr = Arc::clone(&sr);
                    let su = Arc::clone(&su);
                    async move {
                        let idx = sc.fetch_add(1, Ordering::Relaxed);
                        record_username(&su, &headers);
                        let role = req["role_id"].as_str().unwrap_or_default().to_owned();
                        sr.lock().expect("lock").push(role.clone());
                        if idx < empty_replies {
                            return Json(json!({ "session": { "credentials": null } }));
                        }
                        Json(json!({
                            "session": {
                                "credentials": {
                                    "access_key_id": format!("AKIA{role}"),
                                    "secret_access_key": format!("secret-{role}"),
                                }
                            }
                        }))
                    }
                }),
            );

        let addr = spawn_router(app).await;

        Self { addr, roles_calls, session_calls, session_roles, usernames }
    }

    pub fn client(&self) -> BrokerClient {
        client_for(self.addr)
    }

    pub fn session_calls(&self) -> u32 {
        self.session_calls.load(Ordering::Relaxed)
    }

    pub fn roles_calls(&self) -> u32 {
        self.roles_calls.load(Ordering::Relaxed)
    }
}

/// Serve `app` on an ephemeral localhost port.
pub async fn spawn_router(app: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Broker client pointed at `addr`.
pub fn client_for(addr: std::net::SocketAddr) -> BrokerClient {
    BrokerClient::new(
        format!("http://{addr}/roles"),
        format!("http://{addr}/sessions"),
        Duration::from_secs(5),
    )
}

fn record_username(into: &Mutex<Vec<String>>, headers: &HeaderMap) {
    let name = headers
        .get(USERNAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    into.lock().expect("lock").push(name);
}

/// One call made against [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub profile: String,
    pub key: String,
    pub value: String,
}

/// In-memory profile store that can be told to fail for given profiles.
#[derive(Default)]
pub struct MemoryStore {
    pub writes: Mutex<Vec<StoreWrite>>,
    pub failing_profiles: Vec<String>,
    pub missing: bool,
}

impl MemoryStore {
    pub fn failing(profiles: &[&str]) -> Self {
        Self { failing_profiles: profiles.iter().map(|p| (*p).to_owned()).collect(), ..Self::default() }
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().expect("lock").clone()
    }

    pub fn profiles(&self) -> Vec<String> {
        let mut profiles: Vec<String> = self.writes().into_iter().map(|w| w.profile).collect();
        profiles.dedup();
        profiles
    }
}

impl ProfileStore for MemoryStore {
    fn check(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.missing {
                anyhow::bail!("memory store disabled");
            }
            Ok(())
        })
    }

    fn set<'a>(
        &'a self,
        profile: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.writes.lock().expect("lock").push(StoreWrite {
                profile: profile.to_owned(),
                key: key.to_owned(),
                value: value.to_owned(),
            });
            if self.failing_profiles.iter().any(|p| p == profile) {
                anyhow::bail!("store rejected {key} for {profile}");
            }
            Ok(())
        })
    }
}
