//! Session endpoints

use crate::MarsClient;
use crate::error::{ClientError, Result};
use mars_core::dto::auth::{AuthResponse, LoginRequest};
use reqwest::header;

const SESSION_COOKIE: &str = "mars_session";

impl MarsClient {
    // =============================================================================
    // Sessions
    // =============================================================================

    /// Log in and keep the session cookie for subsequent requests
    ///
    /// Returns the session token.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let token = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, token)| token.to_string())
            .ok_or_else(|| ClientError::ParseError("login response carried no session cookie".to_string()))?;

        self.session = Some(token.clone());
        Ok(token)
    }

    /// Drop the current session
    pub async fn logout(&mut self) -> Result<AuthResponse> {
        let response = self
            .authorize(self.client.post(self.url("/api/auth/logout")))
            .send()
            .await?;
        let body = self.handle_response(response).await?;

        self.session = None;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_login_keeps_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "mars_session=tok123; Path=/; HttpOnly")
                    .set_body_json(serde_json::json!({ "success": true, "message": "Login successful" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .and(header_matcher("cookie", "mars_session=tok123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "is_running": false, "status": "Ready" }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = MarsClient::new(server.uri());
        let token = client.login("a@b.com", "pw").await.unwrap();
        assert_eq!(token, "tok123");
        assert_eq!(client.status().await.unwrap().status, "Ready");
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                serde_json::json!({ "success": false, "error": "Invalid credentials" }),
            ))
            .mount(&server)
            .await;

        let mut client = MarsClient::new(server.uri());
        let err = client.login("", "").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "success": true, "message": "Logged out successfully" }),
            ))
            .mount(&server)
            .await;

        let mut client = MarsClient::new(server.uri()).with_session("tok");
        let response = client.logout().await.unwrap();
        assert!(response.success);
        assert!(client.session().is_none());
    }
}
