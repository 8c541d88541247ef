use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize, Serialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct LoginResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Identity of the caller, taken from a verified session cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Browsers may split cookies over several headers.
        let cookies: Vec<&str> = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        let cookie_header = (!cookies.is_empty()).then(|| cookies.join("; "));

        state
            .guard
            .authenticate(cookie_header.as_deref())
            .map(AuthenticatedUser)
            .map_err(|_| ApiError::Unauthenticated)
    }
}

fn set_cookie(value: String) -> Result<[(header::HeaderName, HeaderValue); 1], ApiError> {
    let value = HeaderValue::from_str(&value).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok([(header::SET_COOKIE, value)])
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(username = %request.username, "Login attempt");

    let identity = match state
        .verifier
        .authenticate_credentials(&request.username, &request.password)
        .await
    {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            tracing::warn!(username = %request.username, "Login failed");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => {
            tracing::error!(username = %request.username, "Credential lookup failed: {}", e);
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = state.codec.issue(&identity);
    let headers = set_cookie(state.cookie.issue(&token))?;

    tracing::info!(username = %identity, "Login successful");
    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            username: Some(identity),
            message: Some("Login successful".to_string()),
        }),
    ))
}

async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let headers = set_cookie(state.cookie.clear())?;
    Ok((
        headers,
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    ))
}

async fn me(AuthenticatedUser(username): AuthenticatedUser) -> impl IntoResponse {
    Json(json!({ "username": username }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{self, COOKIE_NAME};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use cortex_relay::relay::FieldFilter;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = test_support::state("http://127.0.0.1:1/agent", FieldFilter::disabled());
        (routes(state.clone()), state)
    }

    fn login_request(username: &str, password: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/auth/login")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                })
                .unwrap(),
            ))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let (app, state) = app();

        let response = app.oneshot(login_request("alice", "hunter2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with(&format!("{}=", COOKIE_NAME)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));

        // The issued cookie authenticates on its own.
        let pair = cookie.split(';').next().unwrap();
        assert_eq!(state.guard.authenticate(Some(pair)).unwrap(), "alice");

        let body: LoginResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert!(body.success);
        assert_eq!(body.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let (app, _) = app();

        let response = app.oneshot(login_request("alice", "wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(
            json_body(response).await["detail"],
            "Invalid username or password"
        );
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let (app, state) = app();

        let anonymous = Request::builder()
            .uri("/api/auth/me")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["detail"], "Not authenticated");

        let signed_in = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, test_support::session_cookie(&state, "alice"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(signed_in).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["username"], "alice");
    }

    #[tokio::test]
    async fn test_tampered_session_is_rejected() {
        let (app, state) = app();
        let cookie = format!("{}x", test_support::session_cookie(&state, "alice"));

        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (app, _) = app();

        let request = Request::builder()
            .uri("/api/auth/logout")
            .method("POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
        assert_eq!(json_body(response).await["success"], true);
    }
}
