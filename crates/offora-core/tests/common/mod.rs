//! Shared fixtures for integration tests: a wiremock backend, a client
//! bound to it, and unsigned JWTs carrying marketplace claims.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::json;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use offora_core::api::{ApiClient, ClientOptions};
use offora_core::auth::{CredentialPair, MemoryTokenStore, Session, TokenStore};

pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// Unsigned JWT; `generation` keeps otherwise identical tokens distinct.
pub fn jwt(username: &str, is_vendor: bool, generation: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600 + generation;
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "token_type": "access",
            "exp": exp,
            "user_id": 42,
            "username": username,
            "is_vendor": is_vendor,
        })
        .to_string(),
    );
    format!("{header}.{payload}.sig{generation}")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub struct TestBackend {
    pub server: MockServer,
    pub store: Arc<MemoryTokenStore>,
    pub session: Arc<Session>,
    pub api: ApiClient,
}

impl TestBackend {
    /// Backend with no stored credentials.
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Backend whose token store already holds `pair`.
    pub async fn start_with(pair: Option<CredentialPair>) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::new());
        if let Some(pair) = pair {
            store.save(&pair).expect("seed token store");
        }
        let session = Arc::new(Session::open(store.clone()));

        let options = ClientOptions {
            request_timeout: Duration::from_secs(5),
            refresh_timeout: Duration::from_secs(2),
            refresh_path: REFRESH_PATH.to_string(),
        };
        let api = ApiClient::with_options(&server.uri(), Arc::clone(&session), options)
            .expect("build client");

        Self {
            server,
            store,
            session,
            api,
        }
    }

    /// Refresh endpoint exchanging `refresh` for `next`, expected `times` times.
    pub async fn mock_refresh(&self, refresh: &str, next: &CredentialPair, times: u64) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(json!({ "refresh": refresh })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access": next.access, "refresh": next.refresh }))
                    .set_delay(Duration::from_millis(150)),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Refresh endpoint rejecting every refresh token.
    pub async fn mock_refresh_revoked(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "detail": "Token is invalid or expired" }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Refresh endpoint that must never be called.
    pub async fn forbid_refresh(&self) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}
