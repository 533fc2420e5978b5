//! Chat-completion content generator
//!
//! Asks an OpenAI-compatible `/chat/completions` endpoint to write each
//! research section. The reply is parsed as lightweight markdown: the first
//! paragraph becomes the summary and bullet lines become key findings.

use async_trait::async_trait;
use mars_core::domain::research::{ResearchResult, Section, StageName};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::content::{ContentGenerator, GenerateError};
use crate::config::LlmSettings;

const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You are a member of a multi-agent research team. \
Answer in markdown. Start with a one-paragraph summary, then list the key findings \
as bullet points, then give the detailed analysis under level-two headings.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Generator backed by an OpenAI-compatible chat-completion API
pub struct ChatCompletionGenerator {
    client: Client,
    settings: LlmSettings,
}

impl ChatCompletionGenerator {
    pub fn new(settings: LlmSettings) -> Result<Self, GenerateError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: Client, settings: LlmSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ContentGenerator for ChatCompletionGenerator {
    async fn generate(
        &self,
        stage: StageName,
        result: &ResearchResult,
    ) -> Result<Section, GenerateError> {
        if !stage.is_research() {
            return Err(GenerateError::NotResearch(stage));
        }

        let request = ChatRequest {
            model: &self.settings.model,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt_for(stage, result),
                },
            ],
        };

        debug!("Requesting {} section from {}", stage, self.settings.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerateError::EmptyCompletion(stage))?;

        Ok(parse_section(stage, &content))
    }

    fn name(&self) -> &str {
        "chat-completion"
    }
}

fn prompt_for(stage: StageName, result: &ResearchResult) -> String {
    let topic = &result.topic;
    let task = match stage {
        StageName::Technology => format!(
            "Research the current state of the art, key technologies and scientific foundations of {}.",
            topic
        ),
        StageName::Market => format!(
            "Analyse the market for {}: size, growth, competitors and demand drivers.",
            topic
        ),
        StageName::Financial => format!(
            "Assess the financial viability of {}: costs, revenue models and break-even.",
            topic
        ),
        StageName::Ux => format!(
            "Research user needs, pain points and design recommendations for {}.",
            topic
        ),
        StageName::Patent => format!(
            "Describe the patent and intellectual property landscape around {}.",
            topic
        ),
        StageName::Regulatory => format!(
            "Assess the regulatory and compliance requirements that apply to {}.",
            topic
        ),
        StageName::Technical => format!(
            "Evaluate the technical feasibility of building {}, including risks and a roadmap.",
            topic
        ),
        StageName::Documentation | StageName::PdfGeneration | StageName::EmailDelivery => format!(
            "Write an integrated overview of the research on {} that connects the findings below.",
            topic
        ),
    };

    let mut prompt = task;
    let previous: Vec<&Section> = StageName::RESEARCH
        .iter()
        .filter(|s| **s < stage)
        .filter_map(|s| result.section(*s))
        .collect();
    if !previous.is_empty() {
        prompt.push_str("\n\nFindings of the team so far:\n");
        for section in previous {
            prompt.push_str(&format!("- {}: {}\n", section.title, section.summary));
        }
    }
    prompt
}

/// Splits a markdown answer into summary, key findings and body
fn parse_section(stage: StageName, content: &str) -> Section {
    let content = content.trim();

    let summary = content
        .split("\n\n")
        .map(str::trim)
        .find(|paragraph| {
            !paragraph.is_empty() && !paragraph.starts_with('#') && !is_bullet(paragraph)
        })
        .unwrap_or(content)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");

    let key_findings = content
        .lines()
        .map(str::trim)
        .filter(|line| is_bullet(line))
        .map(|line| line[2..].trim().to_string())
        .filter(|finding| !finding.is_empty())
        .take(5)
        .collect();

    Section {
        title: stage.title().to_string(),
        summary,
        key_findings,
        body: content.to_string(),
    }
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}
