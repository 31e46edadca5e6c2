// SPDX-License-Identifier: BUSL-1.1
//! Route definitions for the identity service stub.
//!
//! Covers the endpoints `helio-session` calls (`/auth/v1/user`,
//! `/auth/v1/health`) plus sign-in and sign-out so a developer can obtain a
//! token for the session cookie. Every `/auth/v1` call needs an `apikey`
//! header; its value is not checked.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::store::AppState;

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/v1/health", get(health))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/logout", post(logout))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    email: String,
}

async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TokenRequest>,
) -> Response {
    if let Some(resp) = require_api_key(&headers) {
        return resp;
    }
    if !body.email.contains('@') {
        return error(StatusCode::BAD_REQUEST, "invalid email");
    }

    let (access_token, user) = state.issue_token(&body.email);
    tracing::info!(user_id = %user.id, "issued token");
    Json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user,
    }))
    .into_response()
}

async fn user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(resp) = require_api_key(&headers) {
        return resp;
    }
    match bearer(&headers).and_then(|t| state.user_for_token(t)) {
        Some(user) => Json(user).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "invalid JWT"),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(resp) = require_api_key(&headers) {
        return resp;
    }
    match bearer(&headers) {
        Some(token) => {
            if state.revoke(token) {
                tracing::info!(active = state.active_tokens(), "token revoked");
            }
            StatusCode::NO_CONTENT.into_response()
        }
        None => error(StatusCode::UNAUTHORIZED, "missing bearer token"),
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

fn require_api_key(headers: &HeaderMap) -> Option<Response> {
    match headers.get("apikey") {
        Some(v) if !v.is_empty() => None,
        _ => Some(error(StatusCode::UNAUTHORIZED, "no API key found in request")),
    }
}

fn error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "code": status.as_u16(), "msg": msg }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sign_in(email: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/v1/token")
            .header("apikey", "anon")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "email": email }).to_string()))
            .unwrap()
    }

    fn with_token(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("apikey", "anon")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = router(AppState::new());
        for uri in ["/health", "/auth/v1/health"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn sign_in_user_logout_lifecycle() {
        let state = AppState::new();
        let app = router(state.clone());

        let resp = app.clone().oneshot(sign_in("rep@helio.example")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let token = body["access_token"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(with_token("GET", "/auth/v1/user", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let user = body_json(resp).await;
        assert_eq!(user["id"], user_id.as_str());
        assert_eq!(user["email"], "rep@helio.example");

        let resp = app
            .clone()
            .oneshot(with_token("POST", "/auth/v1/logout", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.active_tokens(), 0);

        let resp = app
            .oneshot(with_token("GET", "/auth/v1/user", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_token_is_401() {
        let app = router(AppState::new());
        let resp = app
            .oneshot(with_token("GET", "/auth/v1/user", "stub-nope"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_api_key_is_401() {
        let app = router(AppState::new());
        let req = Request::builder()
            .uri("/auth/v1/user")
            .header("authorization", "Bearer anything")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["msg"], "no API key found in request");
    }

    #[tokio::test]
    async fn invalid_email_is_400() {
        let app = router(AppState::new());
        let resp = app.oneshot(sign_in("not-an-email")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
