//! API Module
//!
//! HTTP API layer of the research service.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod error;
pub mod health;
pub mod report;
pub mod research;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::SharedState;

/// Create the main API router with all endpoints
pub fn create_router(state: SharedState) -> Router {
    let protected = Router::new()
        // Research endpoints
        .route("/start-research", post(research::start_research))
        .route("/status", get(research::get_status))
        .route("/result", get(research::get_result))
        // Report endpoints
        .route("/download-pdf/{report_type}", get(report::download_pdf))
        .route("/view-pdf/{report_type}", get(report::view_pdf))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth endpoints
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .merge(protected)
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::app_state;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use mars_core::dto::research::StatusResponse;
    use std::time::Duration;
    use tower::ServiceExt;

    const AUTH: &str = "Bearer test";

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get_authed(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, AUTH)
            .body(Body::empty())
            .unwrap()
    }

    fn start(topic: &str, email: &str) -> Request<Body> {
        Request::post("/start-research")
            .header(header::AUTHORIZATION, AUTH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "topic": topic, "recipient_email": email }).to_string(),
            ))
            .unwrap()
    }

    fn error_of(body: &[u8]) -> String {
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        value["error"].as_str().unwrap_or_default().to_string()
    }

    async fn wait_until_idle(app: &Router) -> StatusResponse {
        for _ in 0..500 {
            let (_, body) = send(app, get_authed("/status")).await;
            let status: StatusResponse = serde_json::from_slice(&body).unwrap();
            if !status.is_running && status.finished_at.is_some() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not finish");
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_protected_endpoints_require_auth() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        for uri in ["/status", "/result", "/download-pdf/executive", "/view-pdf/market"] {
            let (status, body) = send(&app, Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(error_of(&body), "Authentication required");
        }
    }

    #[tokio::test]
    async fn test_login_cookie_grants_access() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let login = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
            .unwrap();
        let response = app.clone().oneshot(login).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("mars_session="));

        let status_request = || {
            Request::get("/status")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = send(&app, status_request()).await;
        assert_eq!(status, StatusCode::OK);

        let logout = Request::post("/api/auth/logout")
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, logout).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, status_request()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let login = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.com"}"#))
            .unwrap();
        let (status, body) = send(&app, login).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&body), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_initial_status() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let (status, body) = send(&app, get_authed("/status")).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.status, "Ready");
    }

    #[tokio::test]
    async fn test_start_research_validation() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let (status, body) = send(&app, start("", "a@b.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&body), "Topic and recipient email are required");

        let (status, body) = send(&app, start("Topic", "not-an-email")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_of(&body).starts_with("Invalid recipient email"));

        let (status, body) = send(&app, start("Batteries\r\nBcc: x@evil.com", "a@b.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error_of(&body),
            "Topic and recipient email must not contain control characters"
        );
    }

    #[tokio::test]
    async fn test_start_research_bad_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let no_content_type = Request::post("/start-research")
            .header(header::AUTHORIZATION, AUTH)
            .body(Body::from(r#"{"topic":"T","recipient_email":"a@b.com"}"#))
            .unwrap();
        let (status, body) = send(&app, no_content_type).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error_of(&body).is_empty());

        let malformed = Request::post("/start-research")
            .header(header::AUTHORIZATION, AUTH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, get_authed("/status")).await;
        let snapshot: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert!(!snapshot.is_running);
    }

    #[tokio::test]
    async fn test_research_lifecycle_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(app_state(dir.path()));

        let (_, body) = send(&app, get_authed("/download-pdf/executive")).await;
        assert_eq!(error_of(&body), "No research data available");

        let (status, body) = send(&app, start("Quantum Batteries", "a@b.com")).await;
        assert_eq!(status, StatusCode::OK);
        let message: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(message["message"], "Research started successfully");

        let (status, body) = send(&app, start("Another", "c@d.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&body), "Research is already running");

        let finished = wait_until_idle(&app).await;
        assert!(finished.status.contains("a@b.com"));
        assert!(finished.last_outcome.unwrap().is_success());

        let (status, body) = send(&app, get_authed("/result")).await;
        assert_eq!(status, StatusCode::OK);
        let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(result["topic"], "Quantum Batteries");

        let response = app
            .clone()
            .oneshot(get_authed("/download-pdf/executive"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"mars_executive_report_quantum_batteries.pdf\""
        );

        let response = app.clone().oneshot(get_authed("/view-pdf/Market")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("inline")
        );

        let (status, _) = send(&app, get_authed("/download-pdf/bogus")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
