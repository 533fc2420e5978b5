//! Content generation service
//!
//! Produces the research section of each content stage. The template
//! generator is deterministic and needs no network access; the
//! chat-completion generator lives in `llm`.

use async_trait::async_trait;
use mars_core::domain::research::{ResearchResult, Section, StageName};
use thiserror::Error;

/// Errors raised while generating a section
#[derive(Debug, Error)]
pub enum GenerateError {
    /// HTTP request to the model backend failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Model backend answered with an error status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Model backend answered without any content
    #[error("empty completion for {0} stage")]
    EmptyCompletion(StageName),

    /// Stage does not produce a research section
    #[error("{0} is not a research stage")]
    NotResearch(StageName),

    #[error("{0}")]
    Other(String),
}

/// Service trait for producing research sections
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates the section of a research stage
    ///
    /// # Arguments
    /// * `stage` - The research stage to generate
    /// * `result` - Fragments produced by the previous stages (and the topic)
    async fn generate(
        &self,
        stage: StageName,
        result: &ResearchResult,
    ) -> Result<Section, GenerateError>;

    /// Generator name for logging
    fn name(&self) -> &str;
}

/// Canned, topic-parameterised sections
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator {}

impl TemplateGenerator {
    pub fn new() -> Self {
        Self {}
    }

    fn section_for(&self, stage: StageName, result: &ResearchResult) -> Option<Section> {
        let topic = result.topic.as_str();
        let (summary, key_findings, body) = match stage {
            StageName::Technology => (
                format!(
                    "{} builds on a maturing base of enabling technologies with several competing approaches still in play.",
                    topic
                ),
                vec![
                    format!("Core {} technology has moved from laboratory prototypes to early pilots", topic),
                    "Three competing architectures dominate current research output".to_string(),
                    "Materials cost and manufacturing yield remain the main technical bottlenecks".to_string(),
                ],
                format!(
                    "## State of the Art\n\
                     Research activity around {topic} has accelerated over the last five years, with publication volume roughly doubling.\n\n\
                     ## Competing Approaches\n\
                     - Incremental refinement of established designs\n\
                     - Hybrid architectures combining existing components\n\
                     - Novel approaches with higher risk and higher ceiling\n\n\
                     ## Outlook\n\
                     Expect **consolidation** around one or two designs within the next product cycle."
                ),
            ),
            StageName::Market => (
                format!(
                    "The addressable market for {} is growing steadily, driven by early adopters in industrial and enterprise segments.",
                    topic
                ),
                vec![
                    "Early adopters are concentrated in industrial and enterprise segments".to_string(),
                    "Incumbents hold distribution advantages; startups lead on innovation".to_string(),
                    "Pricing pressure is expected once second-generation products ship".to_string(),
                ],
                format!(
                    "## Market Size\n\
                     The {topic} market is still small but expanding at a double-digit annual rate.\n\n\
                     ## Competitive Landscape\n\
                     - Established vendors extending existing product lines\n\
                     - Venture-backed startups focused on a single application\n\
                     - Research spin-offs licensing core intellectual property\n\n\
                     ## Demand Drivers\n\
                     Regulation, cost reduction targets and sustainability commitments all pull demand forward."
                ),
            ),
            StageName::Financial => (
                format!(
                    "A {} venture needs significant upfront capital but can reach attractive margins at scale.",
                    topic
                ),
                vec![
                    "Upfront R&D and tooling dominate the first three years of spend".to_string(),
                    "Gross margins improve sharply once production volume is reached".to_string(),
                    "Licensing offers a lower-risk revenue path than direct manufacturing".to_string(),
                ],
                format!(
                    "## Cost Structure\n\
                     Development costs for {topic} are front-loaded, with tooling and certification as the largest items.\n\n\
                     ## Revenue Models\n\
                     - Direct product sales\n\
                     - Technology licensing\n\
                     - Service and maintenance contracts\n\n\
                     ## Break-even\n\
                     Under base-case assumptions break-even is reached in year four or five."
                ),
            ),
            StageName::Ux => (
                format!(
                    "Users value reliability and simple integration of {} over raw performance.",
                    topic
                ),
                vec![
                    "Integration effort is the most cited adoption barrier".to_string(),
                    "Users expect clear status feedback and predictable behaviour".to_string(),
                    "Accessibility needs are rarely addressed by current offerings".to_string(),
                ],
                format!(
                    "## User Needs\n\
                     Interviews with prospective {topic} users highlight reliability, transparency and ease of integration.\n\n\
                     ## Pain Points\n\
                     - Complex onboarding\n\
                     - Opaque failure modes\n\
                     - Limited documentation\n\n\
                     ## Design Recommendations\n\
                     Prioritise guided setup, clear diagnostics and sensible defaults."
                ),
            ),
            StageName::Patent => (
                format!(
                    "The {} patent landscape is crowded in core components but leaves room in integration and applications.",
                    topic
                ),
                vec![
                    "Core component patents are held by a small number of large assignees".to_string(),
                    "Application-level and integration patents are less concentrated".to_string(),
                    "Several foundational patents expire within the next decade".to_string(),
                ],
                format!(
                    "## Filing Trends\n\
                     Patent filings related to {topic} have grown steadily, led by a handful of corporate assignees.\n\n\
                     ## Freedom to Operate\n\
                     - Core components: high risk, licensing likely required\n\
                     - System integration: moderate risk\n\
                     - Applications: low risk, good white space\n\n\
                     ## Strategy\n\
                     Focus filings on integration methods and application-specific improvements."
                ),
            ),
            StageName::Regulatory => (
                format!(
                    "{} falls under existing safety and product regulations, with sector-specific rules still evolving.",
                    topic
                ),
                vec![
                    "Existing product safety standards apply from day one".to_string(),
                    "Sector-specific regulation is expected within two to three years".to_string(),
                    "Early engagement with certification bodies shortens time to market".to_string(),
                ],
                format!(
                    "## Applicable Frameworks\n\
                     Products based on {topic} must satisfy general product safety, environmental and data protection requirements.\n\n\
                     ## Certification\n\
                     - Safety certification before commercial sale\n\
                     - Environmental compliance for materials and disposal\n\
                     - Data protection where user data is processed\n\n\
                     ## Emerging Rules\n\
                     Track draft standards closely and participate in consultations."
                ),
            ),
            StageName::Technical => (
                format!(
                    "Building {} is technically feasible today, with manufacturing scale-up as the main risk.",
                    topic
                ),
                vec![
                    "A minimum viable product can be built with available components".to_string(),
                    "Scale-up and quality control carry the highest execution risk".to_string(),
                    "A phased roadmap de-risks the investment".to_string(),
                ],
                format!(
                    "## Feasibility\n\
                     A working {topic} prototype can be assembled from commercially available components.\n\n\
                     ## Risks\n\
                     - Manufacturing yield\n\
                     - Supply chain concentration\n\
                     - Long-term reliability data\n\n\
                     ## Roadmap\n\
                     1. Prototype and validation\n\
                     2. Pilot production\n\
                     3. Volume manufacturing"
                ),
            ),
            StageName::Documentation => {
                let completed: Vec<&Section> = StageName::RESEARCH
                    .iter()
                    .filter(|s| **s != StageName::Documentation)
                    .filter_map(|s| result.section(*s))
                    .collect();

                let mut body = format!(
                    "## Overview\nThis package consolidates {} research streams on {}.\n\n",
                    completed.len(),
                    topic
                );
                for section in &completed {
                    body.push_str(&format!("## {}\n{}\n\n", section.title, section.summary));
                }

                (
                    format!(
                        "Consolidated findings across {} research streams on {}.",
                        completed.len(),
                        topic
                    ),
                    completed
                        .iter()
                        .filter_map(|s| s.key_findings.first().cloned())
                        .collect(),
                    body.trim_end().to_string(),
                )
            }
            StageName::PdfGeneration | StageName::EmailDelivery => return None,
        };

        Some(Section {
            title: stage.title().to_string(),
            summary,
            key_findings,
            body,
        })
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(
        &self,
        stage: StageName,
        result: &ResearchResult,
    ) -> Result<Section, GenerateError> {
        self.section_for(stage, result)
            .ok_or(GenerateError::NotResearch(stage))
    }

    fn name(&self) -> &str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mars_core::domain::research::{ResearchRequest, StageOutput};

    fn empty_result() -> ResearchResult {
        ResearchResult::new(&ResearchRequest::new("Quantum Batteries", "a@b.com"))
    }

    #[tokio::test]
    async fn test_template_mentions_topic() {
        let generator = TemplateGenerator::new();
        let result = empty_result();

        for stage in StageName::RESEARCH {
            let section = generator.generate(stage, &result).await.unwrap();
            assert_eq!(section.title, stage.title());
            assert!(
                section.summary.contains("Quantum Batteries"),
                "summary of {} should mention the topic",
                stage
            );
        }
    }

    #[tokio::test]
    async fn test_template_rejects_non_research_stages() {
        let generator = TemplateGenerator::new();
        let err = generator
            .generate(StageName::PdfGeneration, &empty_result())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NotResearch(StageName::PdfGeneration)));
    }

    #[tokio::test]
    async fn test_documentation_reads_previous_sections() {
        let generator = TemplateGenerator::new();
        let mut result = empty_result();
        for stage in [StageName::Technology, StageName::Market] {
            let section = generator.generate(stage, &result).await.unwrap();
            result.insert(stage, StageOutput::Section(section));
        }

        let docs = generator
            .generate(StageName::Documentation, &result)
            .await
            .unwrap();
        assert!(docs.summary.contains("2 research streams"));
        assert_eq!(docs.key_findings.len(), 2);
        assert!(docs.body.contains("## Market Analysis"));
    }
}
