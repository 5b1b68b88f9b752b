//! API client for communicating with the Offora REST backend.
//!
//! `ApiClient::execute` is the authenticated request pipeline: it attaches
//! the session's bearer token, and on a `401` asks the refresh coordinator
//! for a new token and retries the call exactly once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{
    CredentialPair, Principal, RefreshCoordinator, Session, TokenRefresher,
    DEFAULT_REFRESH_TIMEOUT,
};

use super::request::{ApiRequest, Attempt};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured (local development backend).
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Login endpoint, relative to the base URL.
const LOGIN_PATH: &str = "/api/login/";

/// Refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/api/token/refresh/";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Tunables for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    pub refresh_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// The backend may or may not rotate the refresh token.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    refresh: Option<String>,
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    }
}

/// Refreshes against `POST {refresh_path} {refresh}`.
struct HttpRefresher {
    client: Client,
    url: String,
}

impl TokenRefresher for HttpRefresher {
    fn refresh(&self, refresh_token: String) -> BoxFuture<'static, Result<CredentialPair>> {
        let client = self.client.clone();
        let url = self.url.clone();
        async move {
            let response = client
                .post(&url)
                .json(&RefreshRequest {
                    refresh: &refresh_token,
                })
                .send()
                .await
                .context("Failed to send token refresh request")?;

            let response = ApiClient::check_response(response).await?;
            let body: RefreshResponse = response
                .json()
                .await
                .context("Failed to parse token refresh response")?;

            Ok(CredentialPair {
                access: body.access,
                refresh: body.refresh.unwrap_or(refresh_token),
            })
        }
        .boxed()
    }
}

/// API client for the marketplace backend.
/// Clone is cheap - the HTTP client, session and coordinator are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    session: Arc<Session>,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a client with default options.
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self> {
        Self::with_options(base_url, session, ClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        session: Arc<Session>,
        options: ClientOptions,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let refresher = HttpRefresher {
            client: client.clone(),
            url: join_url(base_url, &options.refresh_path),
        };
        let refresh = RefreshCoordinator::new(Arc::clone(&session), Arc::new(refresher))
            .with_timeout(options.refresh_timeout);

        Ok(Self::from_parts(client, base_url, session, refresh))
    }

    /// Assemble a client around an existing coordinator.
    pub fn from_parts(
        client: Client,
        base_url: &str,
        session: Arc<Session>,
        refresh: RefreshCoordinator,
    ) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            session,
            refresh: Arc::new(refresh),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Number of refresh calls this client has issued.
    pub fn refresh_calls(&self) -> usize {
        self.refresh.network_calls()
    }

    // ===== Session =====

    /// Exchange username/password for a credential pair and log in.
    pub async fn login(&self, username: &str, password: &str) -> Result<Principal> {
        let request = ApiRequest::post(LOGIN_PATH)
            .anonymous()
            .json(&LoginRequest { username, password })?;

        let response = self
            .execute(request)
            .await
            .context("Failed to send login request")?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::LoginRejected.into());
        }

        let response = Self::check_response(response).await?;
        let pair: CredentialPair = response
            .json()
            .await
            .context("Failed to parse login response")?;

        let principal = self.session.login(pair)?;
        Ok(principal)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    // ===== Pipeline =====

    /// Send `request` with the current bearer token, refreshing and retrying
    /// once on `401`. Any other response is returned as-is.
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut attempt = Attempt::First;
        let mut token = if request.anonymous {
            None
        } else {
            self.session.access_token()
        };

        loop {
            let response = self.send(&request, token.as_deref(), attempt).await?;
            if request.anonymous || response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            match attempt {
                Attempt::Retry => {
                    warn!(path = %request.path, "Still unauthorized after refresh");
                    return Err(ApiError::Unauthenticated);
                }
                Attempt::First => match self.refresh.refresh(token.as_deref()).await {
                    Ok(fresh) => {
                        token = Some(fresh);
                        attempt = Attempt::Retry;
                    }
                    Err(e) => {
                        warn!(path = %request.path, error = %e, "Session could not be refreshed");
                        return Err(ApiError::Unauthenticated);
                    }
                },
            }
        }
    }

    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        attempt: Attempt,
    ) -> Result<Response, ApiError> {
        let url = join_url(&self.base_url, &request.path);
        debug!(method = %request.method, url = %url, ?attempt, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    pub(crate) async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Execute and decode a JSON body, backing off on 429.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.execute_with_backoff(request).await?;
        let url = response.url().to_string();
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Execute a call whose response body is irrelevant.
    pub(crate) async fn fetch_empty(&self, request: ApiRequest) -> Result<()> {
        self.execute_with_backoff(request).await?;
        Ok(())
    }

    async fn execute_with_backoff(&self, request: ApiRequest) -> Result<Response> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .execute(request.clone())
                .await
                .with_context(|| {
                    format!("Failed to send {} request to {}", request.method, request.path)
                })?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(Self::check_response(response).await?);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited.into());
            }
            warn!(
                path = %request.path,
                retry = retries,
                backoff_ms = backoff_ms,
                "Rate limited, backing off"
            );
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }
}
