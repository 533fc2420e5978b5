//! Gmail API transport
//!
//! Exchanges the configured OAuth refresh token for an access token, then
//! submits the raw MIME message to `users/me/messages/send`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::Utc;
use mars_core::domain::research::DeliveryReceipt;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::mail::{DEFAULT_SENDER, Email, MailError, Mailer, build_mime_message, load_attachments};
use crate::config::GmailCredentials;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://gmail.googleapis.com";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Sends mail through the Gmail REST API
pub struct GmailMailer {
    client: Client,
    credentials: GmailCredentials,
    token_url: String,
    api_base: String,
}

impl GmailMailer {
    pub fn new(credentials: GmailCredentials) -> Self {
        Self::with_endpoints(credentials, TOKEN_URL, API_BASE)
    }

    /// Creates a mailer talking to custom endpoints
    pub fn with_endpoints(
        credentials: GmailCredentials,
        token_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            credentials,
            token_url: token_url.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn access_token(&self) -> Result<String, MailError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MailError::Auth(format!(
                "token exchange failed ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    async fn send(&self, email: &Email) -> Result<DeliveryReceipt, MailError> {
        let attachments = load_attachments(&email.attachments).await?;
        let sender = self
            .credentials
            .sender
            .as_deref()
            .unwrap_or(DEFAULT_SENDER);
        let local_id = format!("{}@mars.local", Uuid::new_v4());
        let message = build_mime_message(sender, email, &attachments, &local_id);

        let token = self.access_token().await?;
        debug!("Obtained Gmail access token");

        let response = self
            .client
            .post(format!("{}/gmail/v1/users/me/messages/send", self.api_base))
            .bearer_auth(token)
            .json(&serde_json::json!({ "raw": URL_SAFE.encode(message.as_bytes()) }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendResponse = response.json().await?;
        info!("Gmail accepted message {} for {}", sent.id, email.to);

        Ok(DeliveryReceipt {
            recipient: email.to.clone(),
            message_id: sent.id,
            attachments: attachments.len(),
            delivered_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "gmail"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> GmailCredentials {
        GmailCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            sender: Some("mars@example.com".to_string()),
        }
    }

    fn email(attachments: Vec<std::path::PathBuf>) -> Email {
        Email {
            to: "a@b.com".to_string(),
            subject: "MARS Research Report: Topic".to_string(),
            body: "Hello".to_string(),
            attachments,
        }
    }

    async fn mount_token(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(serde_json::json!({ "access_token": "ya29.token" })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_send_exchanges_token_and_posts_raw_message() {
        let server = MockServer::start().await;
        mount_token(&server, 200).await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_string_contains("\"raw\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "msg-42" })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("report.pdf");
        std::fs::write(&report, b"%PDF-1.4").unwrap();

        let mailer = GmailMailer::with_endpoints(
            credentials(),
            format!("{}/token", server.uri()),
            server.uri(),
        );
        let receipt = mailer.send(&email(vec![report])).await.unwrap();

        assert_eq!(receipt.message_id, "msg-42");
        assert_eq!(receipt.attachments, 1);
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_error() {
        let server = MockServer::start().await;
        mount_token(&server, 400).await;

        let mailer = GmailMailer::with_endpoints(
            credentials(),
            format!("{}/token", server.uri()),
            server.uri(),
        );
        let err = mailer.send(&email(vec![])).await.unwrap_err();
        assert!(matches!(err, MailError::Auth(_)));
    }

    #[tokio::test]
    async fn test_send_failure_is_api_error() {
        let server = MockServer::start().await;
        mount_token(&server, 200).await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
            .mount(&server)
            .await;

        let mailer = GmailMailer::with_endpoints(
            credentials(),
            format!("{}/token", server.uri()),
            server.uri(),
        );
        let err = mailer.send(&email(vec![])).await.unwrap_err();
        assert!(matches!(err, MailError::Api { status: 403, .. }));
    }
}
