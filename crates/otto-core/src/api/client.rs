//! API client for communicating with the Otto REST API.
//!
//! This module provides the `ApiClient` struct for logging in and making
//! authenticated requests, and the `AuthApi` trait the session store uses
//! to reach it.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{DataInfo, LoginRequest, LoginResponse, RouteLogging, Turn, TurnData, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix shared by every backend endpoint
const API_PREFIX: &str = "/api";

/// Default HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The operations the session store needs from the backend.
///
/// `ApiClient` is the production implementation; tests script their own.
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    /// Look up the user a token belongs to
    fn fetch_current_user(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;
}

/// API client for the Otto backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the server at `base_url`
    /// (for example `http://localhost:8080`).
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Send a request, mapping "no response at all" to `NetworkUnavailable`.
    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        request.send().await.map_err(|e| {
            warn!(error = %e, "Request did not get a response");
            ApiError::from_transport(&e)
        })
    }

    /// Check if response is successful, returning an error with the
    /// server's message if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %ApiError::truncate_body(&body), "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await.map_err(|e| ApiError::from_transport(&e))?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, body = %ApiError::truncate_body(&text), "Failed to parse response");
            ApiError::InvalidResponse(e.to_string())
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        debug!(path, "GET");
        let request = self.client.get(self.url(path)).bearer_auth(token);
        let response = Self::check_response(Self::send(request).await?).await?;
        Self::parse(response).await
    }

    // ===== Authentication =====

    /// Log in with email and password.
    ///
    /// A rejected login usually comes back as a non-success status with a
    /// `message`, which surfaces as `RequestFailed(message)`. A success
    /// status may still carry `success: false`; callers must check.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        debug!(email, "POST /auth/login");
        let request = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });
        let response = Self::check_response(Self::send(request).await?).await?;
        Self::parse(response).await
    }

    /// Fetch the profile of the user the token belongs to
    pub async fn fetch_current_user(&self, token: &str) -> Result<UserProfile, ApiError> {
        self.get("/auth/user", token).await
    }

    // ===== Data =====

    /// Fetch the user's data directory descriptor
    pub async fn fetch_data(&self, token: &str) -> Result<DataInfo, ApiError> {
        self.get("/data", token).await
    }

    /// Fetch the descriptor for one turn's output
    pub async fn fetch_turn_data(&self, token: &str, turn: Turn) -> Result<TurnData, ApiError> {
        let path = format!("/data/turn?year={}&month={}", turn.year(), turn.month());
        self.get(&path, token).await
    }

    // ===== Admin =====

    /// Toggle server-side logging of every route. Requires an admin token.
    pub async fn toggle_route_logging(&self, token: &str) -> Result<RouteLogging, ApiError> {
        debug!("POST /admin/debug/log-all-routes");
        let request = self
            .client
            .post(self.url("/admin/debug/log-all-routes"))
            .bearer_auth(token);
        let response = Self::send(request).await?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(ApiError::AccessRequired);
        }
        let response = Self::check_response(response).await?;
        Self::parse(response).await
    }
}

impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        ApiClient::login(self, email, password).await
    }

    async fn fetch_current_user(&self, token: &str) -> Result<UserProfile, ApiError> {
        ApiClient::fetch_current_user(self, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::{json, Value};

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, Some(Duration::from_secs(5))).expect("build client")
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[derive(Deserialize)]
    struct TurnQuery {
        year: u32,
        month: u32,
    }

    fn backend() -> Router {
        Router::new()
            .route(
                "/api/auth/login",
                post(|Json(body): Json<Value>| async move {
                    if body["email"] == "a@b.com" && body["password"] == "x" {
                        (AxumStatus::OK, Json(json!({"success": true, "token": "T1", "clan": "0138", "userId": 1})))
                    } else {
                        (
                            AxumStatus::UNAUTHORIZED,
                            Json(json!({"success": false, "message": "Invalid credentials"})),
                        )
                    }
                }),
            )
            .route(
                "/api/auth/user",
                get(|headers: HeaderMap| async move {
                    match bearer(&headers).as_deref() {
                        Some("Bearer T1") => (AxumStatus::OK, Json(json!({"id": 1, "email": "a@b.com", "clan": "0138"}))),
                        _ => (AxumStatus::UNAUTHORIZED, Json(json!({"error": "Authentication required"}))),
                    }
                }),
            )
            .route(
                "/api/data",
                get(|headers: HeaderMap| async move {
                    match bearer(&headers).as_deref() {
                        Some("Bearer T1") => (AxumStatus::OK, Json(json!({"clan": "0138", "path": "/srv/0138/data"}))),
                        _ => (AxumStatus::UNAUTHORIZED, Json(json!({"error": "Authentication required"}))),
                    }
                }),
            )
            .route(
                "/api/data/turn",
                get(|Query(q): Query<TurnQuery>| async move {
                    Json(json!({"turn": {"year": q.year, "month": q.month}, "exists": false}))
                }),
            )
            .route(
                "/api/admin/debug/log-all-routes",
                post(|headers: HeaderMap| async move {
                    match bearer(&headers).as_deref() {
                        Some("Bearer ADMIN") => (AxumStatus::OK, Json(json!({"success": true, "logging": "enabled"}))),
                        _ => (AxumStatus::FORBIDDEN, Json(json!({"error": "Admin access required"}))),
                    }
                }),
            )
            .route("/api/broken", get(|| async { (AxumStatus::BAD_GATEWAY, "upstream exploded") }))
            .route("/api/garbage", get(|| async { "not json" }))
    }

    #[tokio::test]
    async fn test_login_success() {
        let api = client(&spawn_server(backend()).await);
        let resp = api.login("a@b.com", "x").await.expect("login should succeed");
        assert!(resp.success);
        assert_eq!(resp.issued_token(), Some("T1"));
        assert_eq!(resp.clan.as_deref(), Some("0138"));
    }

    #[tokio::test]
    async fn test_login_rejected_uses_server_message() {
        let api = client(&spawn_server(backend()).await);
        let err = api.login("a@b.com", "wrong").await.unwrap_err();
        assert_eq!(err, ApiError::RequestFailed("Invalid credentials".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_current_user_sends_bearer_token() {
        let api = client(&spawn_server(backend()).await);
        let user = api.fetch_current_user("T1").await.expect("profile");
        assert_eq!(user.email(), Some("a@b.com"));

        let err = api.fetch_current_user("stale").await.unwrap_err();
        assert_eq!(err, ApiError::RequestFailed("Authentication required".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_data_and_turn() {
        let api = client(&spawn_server(backend()).await);
        let data = api.fetch_data("T1").await.expect("data");
        assert_eq!(data.path.as_deref(), Some("/srv/0138/data"));

        let turn = Turn::new(1901, 4).unwrap();
        let turn_data = api.fetch_turn_data("T1", turn).await.expect("turn data");
        assert_eq!(turn_data.turn.year, 1901);
        assert_eq!(turn_data.turn.month, 4);
        assert!(!turn_data.exists);
    }

    #[tokio::test]
    async fn test_toggle_route_logging_requires_admin() {
        let api = client(&spawn_server(backend()).await);
        let err = api.toggle_route_logging("T1").await.unwrap_err();
        assert_eq!(err, ApiError::AccessRequired);
        assert_eq!(err.to_string(), "Admin access required");

        let resp = api.toggle_route_logging("ADMIN").await.expect("admin toggle");
        assert!(resp.is_enabled());
    }

    #[tokio::test]
    async fn test_non_json_error_falls_back_to_status_text() {
        let api = client(&spawn_server(backend()).await);
        let err = api.get::<Value>("/broken", "T1").await.unwrap_err();
        assert_eq!(err, ApiError::RequestFailed("Bad Gateway".to_string()));
    }

    #[tokio::test]
    async fn test_unparseable_success_body() {
        let api = client(&spawn_server(backend()).await);
        let err = api.get::<DataInfo>("/garbage", "T1").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_unavailable() {
        // Bind then drop to get a port nothing is listening on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("address");
        drop(listener);

        let api = client(&format!("http://{}", addr));
        let err = api.fetch_current_user("T1").await.unwrap_err();
        assert_eq!(err, ApiError::NetworkUnavailable);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = ApiClient::new("http://localhost:8080/", None).expect("build client");
        assert_eq!(api.base_url(), "http://localhost:8080");
        assert_eq!(api.url("/data"), "http://localhost:8080/api/data");
    }
}
