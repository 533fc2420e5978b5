//! Research domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::report::ReportType;

/// A request to research a topic and mail the reports to a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
    pub recipient_email: String,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>, recipient_email: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            recipient_email: recipient_email.into(),
        }
    }

    /// Builds a request from user input
    ///
    /// Both fields are trimmed. The topic ends up in mail headers, so control
    /// characters are rejected in either field.
    pub fn validated(topic: &str, recipient_email: &str) -> Result<Self, InvalidRequest> {
        let topic = topic.trim();
        let recipient_email = recipient_email.trim();

        if topic.is_empty() || recipient_email.is_empty() {
            return Err(InvalidRequest::MissingFields);
        }
        if topic.chars().any(char::is_control) || recipient_email.chars().any(char::is_control) {
            return Err(InvalidRequest::ControlCharacters);
        }
        if !is_plausible_email(recipient_email) {
            return Err(InvalidRequest::InvalidEmail(recipient_email.to_string()));
        }

        Ok(Self::new(topic, recipient_email))
    }
}

/// Why user input could not become a `ResearchRequest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    MissingFields,
    ControlCharacters,
    InvalidEmail(String),
}

impl fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidRequest::MissingFields => f.write_str("Topic and recipient email are required"),
            InvalidRequest::ControlCharacters => {
                f.write_str("Topic and recipient email must not contain control characters")
            }
            InvalidRequest::InvalidEmail(email) => write!(f, "Invalid recipient email: {}", email),
        }
    }
}

impl std::error::Error for InvalidRequest {}

/// Checks the `local@domain.tld` shape
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty() && !name.ends_with('.'),
        None => false,
    }
}

/// Named unit of work within a research job
///
/// The variant order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Technology,
    Market,
    Financial,
    Ux,
    Patent,
    Regulatory,
    Technical,
    Documentation,
    PdfGeneration,
    EmailDelivery,
}

impl StageName {
    /// Every stage in execution order
    pub const ALL: [StageName; 10] = [
        StageName::Technology,
        StageName::Market,
        StageName::Financial,
        StageName::Ux,
        StageName::Patent,
        StageName::Regulatory,
        StageName::Technical,
        StageName::Documentation,
        StageName::PdfGeneration,
        StageName::EmailDelivery,
    ];

    /// Stages that produce a research section
    pub const RESEARCH: [StageName; 8] = [
        StageName::Technology,
        StageName::Market,
        StageName::Financial,
        StageName::Ux,
        StageName::Patent,
        StageName::Regulatory,
        StageName::Technical,
        StageName::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Technology => "technology",
            StageName::Market => "market",
            StageName::Financial => "financial",
            StageName::Ux => "ux",
            StageName::Patent => "patent",
            StageName::Regulatory => "regulatory",
            StageName::Technical => "technical",
            StageName::Documentation => "documentation",
            StageName::PdfGeneration => "pdf-generation",
            StageName::EmailDelivery => "email-delivery",
        }
    }

    /// Section heading used in reports
    pub fn title(&self) -> &'static str {
        match self {
            StageName::Technology => "Technology Research",
            StageName::Market => "Market Analysis",
            StageName::Financial => "Financial Analysis",
            StageName::Ux => "User Experience Research",
            StageName::Patent => "Patent & IP Landscape",
            StageName::Regulatory => "Regulatory & Compliance",
            StageName::Technical => "Technical Feasibility",
            StageName::Documentation => "Comprehensive Documentation",
            StageName::PdfGeneration => "PDF Generation",
            StageName::EmailDelivery => "Email Delivery",
        }
    }

    /// Status text shown to polling clients while the stage runs
    pub fn status_message(&self) -> &'static str {
        match self {
            StageName::Technology => "Technology research in progress...",
            StageName::Market => "Market analysis running...",
            StageName::Financial => "Financial analysis in progress...",
            StageName::Ux => "User experience research in progress...",
            StageName::Patent => "Patent and IP landscape analysis in progress...",
            StageName::Regulatory => "Regulatory compliance assessment in progress...",
            StageName::Technical => "Technical feasibility assessment in progress...",
            StageName::Documentation => "Generating comprehensive reports...",
            StageName::PdfGeneration => "Creating PDF documents...",
            StageName::EmailDelivery => "Sending research package by email...",
        }
    }

    pub fn is_research(&self) -> bool {
        !matches!(self, StageName::PdfGeneration | StageName::EmailDelivery)
    }

    /// 1-based position in the stage sequence
    pub fn position(&self) -> usize {
        *self as usize + 1
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageName::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{}'", s))
    }
}

/// Research section produced by a content stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub summary: String,
    pub key_findings: Vec<String>,
    /// Markdown body
    pub body: String,
}

/// A report file written by the PDF generation stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report_type: ReportType,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Confirmation returned by the mail sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub recipient: String,
    pub message_id: String,
    pub attachments: usize,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
}

/// Fragment produced by one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    Section(Section),
    Reports { reports: Vec<GeneratedReport> },
    Delivery(DeliveryReceipt),
}

/// Output of a research job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub topic: String,
    pub recipient_email: String,
    pub sections: BTreeMap<StageName, StageOutput>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ResearchResult {
    /// Creates an empty result for a request
    pub fn new(request: &ResearchRequest) -> Self {
        Self {
            topic: request.topic.clone(),
            recipient_email: request.recipient_email.clone(),
            sections: BTreeMap::new(),
            completed_at: None,
        }
    }

    /// Records a stage fragment, replacing any previous one for that stage
    pub fn insert(&mut self, stage: StageName, output: StageOutput) {
        self.sections.insert(stage, output);
    }

    /// Returns the research section produced by a stage, if any
    pub fn section(&self, stage: StageName) -> Option<&Section> {
        match self.sections.get(&stage) {
            Some(StageOutput::Section(section)) => Some(section),
            _ => None,
        }
    }

    /// Returns the reports written by the PDF generation stage
    pub fn reports(&self) -> &[GeneratedReport] {
        match self.sections.get(&StageName::PdfGeneration) {
            Some(StageOutput::Reports { reports }) => reports,
            _ => &[],
        }
    }

    pub fn delivery(&self) -> Option<&DeliveryReceipt> {
        match self.sections.get(&StageName::EmailDelivery) {
            Some(StageOutput::Delivery(receipt)) => Some(receipt),
            _ => None,
        }
    }

    /// Whether every stage has recorded a fragment
    pub fn is_complete(&self) -> bool {
        StageName::ALL
            .iter()
            .all(|stage| self.sections.contains_key(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str) -> Section {
        Section {
            title: title.to_string(),
            summary: "summary".to_string(),
            key_findings: vec!["finding".to_string()],
            body: "body".to_string(),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_plausible_email("a@b.com"));
        assert!(is_plausible_email("first.last@mail.example.org"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.com"));
        assert!(!is_plausible_email("a@.com"));
        assert!(!is_plausible_email("a@b."));
        assert!(!is_plausible_email("a b@c.com"));
        assert!(!is_plausible_email("a@b@c.com"));
        assert!(!is_plausible_email("plain"));
    }

    #[test]
    fn test_validated_request() {
        let request = ResearchRequest::validated("  Quantum Batteries ", " a@b.com ").unwrap();
        assert_eq!(request, ResearchRequest::new("Quantum Batteries", "a@b.com"));

        assert_eq!(
            ResearchRequest::validated(" ", "a@b.com"),
            Err(InvalidRequest::MissingFields)
        );
        assert_eq!(
            ResearchRequest::validated("Topic", "nope"),
            Err(InvalidRequest::InvalidEmail("nope".to_string()))
        );
    }

    #[test]
    fn test_validated_rejects_header_injection() {
        assert_eq!(
            ResearchRequest::validated("Batteries\r\nBcc: attacker@evil.com", "a@b.com"),
            Err(InvalidRequest::ControlCharacters)
        );
        assert_eq!(
            ResearchRequest::validated("Batteries", "a@b.com\nBcc: x@evil.com"),
            Err(InvalidRequest::ControlCharacters)
        );
        assert_eq!(
            ResearchRequest::validated("Tab\tTopic", "a@b.com"),
            Err(InvalidRequest::ControlCharacters)
        );
    }

    #[test]
    fn test_stage_order_and_positions() {
        assert_eq!(StageName::ALL.first(), Some(&StageName::Technology));
        assert_eq!(StageName::ALL.last(), Some(&StageName::EmailDelivery));
        assert_eq!(StageName::Technology.position(), 1);
        assert_eq!(StageName::EmailDelivery.position(), 10);
        assert!(StageName::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_stage_name_round_trips_through_str() {
        for stage in StageName::ALL {
            assert_eq!(stage.as_str().parse::<StageName>(), Ok(stage));
        }
        assert!("nonsense".parse::<StageName>().is_err());
    }

    #[test]
    fn test_result_accessors() {
        let request = ResearchRequest::new("Quantum Batteries", "a@b.com");
        let mut result = ResearchResult::new(&request);
        assert!(result.section(StageName::Market).is_none());
        assert!(result.reports().is_empty());

        result.insert(StageName::Market, StageOutput::Section(section("Market")));
        assert_eq!(result.section(StageName::Market).unwrap().title, "Market");
        assert!(!result.is_complete());
    }

    #[test]
    fn test_result_json_uses_stage_names_as_keys() {
        let request = ResearchRequest::new("Quantum Batteries", "a@b.com");
        let mut result = ResearchResult::new(&request);
        result.insert(StageName::Ux, StageOutput::Section(section("UX")));
        result.insert(
            StageName::PdfGeneration,
            StageOutput::Reports {
                reports: Vec::new(),
            },
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sections"]["ux"]["kind"], "section");
        assert_eq!(json["sections"]["pdf-generation"]["kind"], "reports");

        let back: ResearchResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
