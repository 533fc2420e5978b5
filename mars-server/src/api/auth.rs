//! Auth API Handlers
//!
//! Login/logout endpoints and the guard protecting every other endpoint.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mars_core::dto::auth::{AuthResponse, LoginRequest};

use crate::api::error::ApiError;
use crate::service::session::SESSION_COOKIE;
use crate::state::SharedState;

/// POST /api/auth/login
/// Opens a session and sets the session cookie
pub async fn login(State(state): State<SharedState>, Json(req): Json<LoginRequest>) -> Response {
    match state.sessions.login(&req.email, &req.password) {
        Some(token) => {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, token
            );
            let mut response = Json(AuthResponse {
                success: true,
                message: Some("Login successful".to_string()),
                error: None,
            })
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(AuthResponse {
                success: false,
                message: None,
                error: Some("Invalid credentials".to_string()),
            }),
        )
            .into_response(),
    }
}

/// POST /api/auth/logout
/// Drops the caller's session, if any
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.logout(&token);
    }

    let mut response = Json(AuthResponse {
        success: true,
        message: Some("Logged out successfully".to_string()),
        error: None,
    })
    .into_response();
    let expired = format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE);
    if let Ok(value) = HeaderValue::from_str(&expired) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Rejects requests without a known session cookie or an Authorization header
pub async fn require_auth(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let has_session = session_token(headers)
        .map(|token| state.sessions.user(&token).is_some())
        .unwrap_or(false);
    let has_authorization = headers.contains_key(header::AUTHORIZATION);

    if !has_session && !has_authorization {
        tracing::debug!("Rejected unauthenticated request to {}", request.uri().path());
        return Err(ApiError::Unauthorized("Authentication required".to_string()));
    }

    Ok(next.run(request).await)
}

/// Extracts the session token from the Cookie headers
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}
