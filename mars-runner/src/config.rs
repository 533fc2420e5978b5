//! Runner configuration
//!
//! Defines the configurable parameters of a research job: where reports and
//! outgoing mail are written, stage deadlines and pacing, and the optional
//! credentials of the Gmail and chat-completion backends.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

/// OAuth credentials for the Gmail API mailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Address placed in the `From` header
    pub sender: Option<String>,
}

/// Settings for the OpenAI-compatible chat-completion generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub api_key: String,
    /// Base URL of the API (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    pub model: String,
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory PDF reports are written to
    pub output_dir: PathBuf,

    /// Directory outgoing mail is written to when Gmail is not configured
    pub outbox_dir: PathBuf,

    /// Maximum time a single stage may run
    pub stage_timeout: Duration,

    /// Artificial pause before each stage (demo pacing)
    pub stage_delay: Duration,

    /// Gmail mailer credentials; `None` selects the outbox mailer
    pub gmail: Option<GmailCredentials>,

    /// Chat-completion settings; `None` selects the template generator
    pub llm: Option<LlmSettings>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables:
    /// - MARS_OUTPUT_DIR (optional, default: generated_pdfs)
    /// - MARS_OUTBOX_DIR (optional, default: outbox)
    /// - MARS_STAGE_TIMEOUT (optional, seconds, default: 300)
    /// - MARS_STAGE_DELAY_MS (optional, milliseconds, default: 0)
    /// - GMAIL_CLIENT_ID, GMAIL_CLIENT_SECRET, OAUTH_REFRESH_TOKEN (optional, all or none)
    /// - SENDER_EMAIL (optional)
    /// - OPENAI_API_KEY (optional), OPENAI_BASE_URL, MARS_LLM_MODEL
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let output_dir = var("MARS_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let outbox_dir = var("MARS_OUTBOX_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.outbox_dir);

        let stage_timeout = match var("MARS_STAGE_TIMEOUT") {
            Some(s) => Duration::from_secs(
                s.parse::<u64>()
                    .with_context(|| format!("MARS_STAGE_TIMEOUT is not a number: {}", s))?,
            ),
            None => defaults.stage_timeout,
        };

        let stage_delay = match var("MARS_STAGE_DELAY_MS") {
            Some(s) => Duration::from_millis(
                s.parse::<u64>()
                    .with_context(|| format!("MARS_STAGE_DELAY_MS is not a number: {}", s))?,
            ),
            None => defaults.stage_delay,
        };

        let gmail = match (
            var("GMAIL_CLIENT_ID"),
            var("GMAIL_CLIENT_SECRET"),
            var("OAUTH_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(GmailCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                    sender: var("SENDER_EMAIL"),
                })
            }
            (None, None, None) => None,
            _ => anyhow::bail!(
                "incomplete Gmail credentials: GMAIL_CLIENT_ID, GMAIL_CLIENT_SECRET and OAUTH_REFRESH_TOKEN must be set together"
            ),
        };

        let llm = var("OPENAI_API_KEY").map(|api_key| LlmSettings {
            api_key,
            base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: var("MARS_LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        });

        Ok(Self {
            output_dir,
            outbox_dir,
            stage_timeout,
            stage_delay,
            gmail,
            llm,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            anyhow::bail!("output_dir cannot be empty");
        }

        if self.outbox_dir.as_os_str().is_empty() {
            anyhow::bail!("outbox_dir cannot be empty");
        }

        if self.stage_timeout.is_zero() {
            anyhow::bail!("stage_timeout must be greater than 0");
        }

        if self.stage_delay >= self.stage_timeout {
            anyhow::bail!("stage_delay must be shorter than stage_timeout");
        }

        if let Some(llm) = &self.llm {
            if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
                anyhow::bail!("OPENAI_BASE_URL must start with http:// or https://");
            }
            if llm.model.is_empty() {
                anyhow::bail!("LLM model cannot be empty");
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_pdfs"),
            outbox_dir: PathBuf::from("outbox"),
            stage_timeout: Duration::from_secs(300), // 5 minutes
            stage_delay: Duration::ZERO,
            gmail: None,
            llm: None,
        }
    }
}
