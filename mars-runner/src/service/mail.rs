//! Mail delivery service
//!
//! Builds `multipart/mixed` messages carrying the PDF reports and hands them
//! to a transport. The outbox transport writes `.eml` files; the Gmail
//! transport lives in `gmail`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use mars_core::domain::research::DeliveryReceipt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub(crate) const DEFAULT_SENDER: &str = "mars@localhost";
const BASE64_LINE: usize = 76;

/// An outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Files attached as `application/pdf`
    pub attachments: Vec<PathBuf>,
}

/// A loaded attachment
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("attachment not found: {}", .0.display())]
    MissingAttachment(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Service trait for delivering research packages
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a message with its attachments
    async fn send(&self, email: &Email) -> Result<DeliveryReceipt, MailError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// Reads every attachment of an email
///
/// A missing file fails the whole message.
pub async fn load_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>, MailError> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MailError::MissingAttachment(path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        attachments.push(Attachment {
            file_name: file_name(path),
            content_type: "application/pdf",
            data,
        });
    }
    Ok(attachments)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment.pdf".to_string())
}

/// Assembles an RFC 5322 message with a text part and base64 attachments
pub fn build_mime_message(
    from: &str,
    email: &Email,
    attachments: &[Attachment],
    message_id: &str,
) -> String {
    let boundary = format!("mars-{}", Uuid::new_v4().simple());
    let mut out = String::new();

    out.push_str(&format!("From: {}\r\n", strip_controls(from)));
    out.push_str(&format!("To: {}\r\n", strip_controls(&email.to)));
    out.push_str(&format!("Subject: {}\r\n", encode_header(&email.subject)));
    out.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
    out.push_str(&format!("Message-ID: <{}>\r\n", message_id));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    out.push_str(&format!("--{}\r\n", boundary));
    out.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&wrap_base64(email.body.as_bytes()));

    for attachment in attachments {
        let file_name = strip_controls(&attachment.file_name).replace('"', "'");
        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.content_type, file_name
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
            file_name
        ));
        out.push_str(&wrap_base64(&attachment.data));
    }

    out.push_str(&format!("--{}--\r\n", boundary));
    out
}

/// RFC 2047 encoded-word for non-ASCII header values
///
/// Control characters become spaces first so a value can never start a new
/// header line.
fn encode_header(value: &str) -> String {
    let value: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if value.is_ascii() {
        value
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn strip_controls(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

fn wrap_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE * 2 + 2);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE) {
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// Writes messages into a local directory instead of sending them
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &Email) -> Result<DeliveryReceipt, MailError> {
        let attachments = load_attachments(&email.attachments).await?;
        let id = Uuid::new_v4();
        let message_id = format!("{}@mars.local", id);
        let message = build_mime_message(DEFAULT_SENDER, email, &attachments, &message_id);

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.eml", id));
        tokio::fs::write(&path, message).await?;

        info!(
            "Wrote message for {} to outbox: {}",
            email.to,
            path.display()
        );

        Ok(DeliveryReceipt {
            recipient: email.to.clone(),
            message_id,
            attachments: attachments.len(),
            delivered_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "outbox"
    }
}
