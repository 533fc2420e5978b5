//! MARS HTTP Client
//!
//! A type-safe HTTP client for the MARS research service.
//!
//! # Example
//!
//! ```no_run
//! use mars_client::MarsClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MarsClient::new("http://localhost:5000").with_token("secret");
//!
//!     client.start_research("Quantum Batteries", "a@b.com").await?;
//!     let status = client.status().await?;
//!
//!     println!("{}", status.status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod auth;
mod reports;
mod research;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use reports::ReportDownload;

use mars_core::dto::research::ErrorResponse;
use reqwest::{Client, RequestBuilder, header};
use serde::de::DeserializeOwned;

/// HTTP client for the MARS research API
///
/// Requests are authenticated with a bearer token, a session cookie obtained
/// from [`MarsClient::login`], or both.
#[derive(Debug, Clone)]
pub struct MarsClient {
    /// Base URL of the server (e.g., "http://localhost:5000")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Sent as `Authorization: Bearer ...`
    token: Option<String>,
    /// Value of the `mars_session` cookie
    session: Option<String>,
}

impl MarsClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use mars_client::MarsClient;
    ///
    /// let client = MarsClient::new("http://localhost:5000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
            session: None,
        }
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Authenticate every request with an existing session
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current session token, if logged in
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the configured credentials to a request
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match &self.session {
            Some(session) => request.header(header::COOKIE, format!("mars_session={}", session)),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turn a non-success status into an `ApiError`
    ///
    /// The message is taken from the `{error}` body when the server sent one.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = MarsClient::new("http://localhost:5000");
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert!(client.session().is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = MarsClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = MarsClient::with_client("http://localhost:5000", Client::new())
            .with_session("abc");
        assert_eq!(client.session(), Some("abc"));
    }
}
