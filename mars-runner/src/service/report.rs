//! Report rendering service
//!
//! Composes the four PDF reports from a research result. Each report type
//! selects a subset of the research sections; the executive summary keeps
//! only summaries and key findings.

use chrono::Utc;
use mars_core::domain::report::ReportType;
use mars_core::domain::research::{GeneratedReport, ResearchResult, Section};
use std::path::Path;
use thiserror::Error;

use crate::pdf::{DocumentInfo, Font, TextLayout};

const GENERATED_BY: &str = "Generated by MARS - Multi-Agent Research System";
const MAX_SLUG_LEN: usize = 50;

const TITLE_SIZE: f32 = 24.0;
const HEADING_SIZE: f32 = 16.0;
const SUBHEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;

#[derive(Debug, Error)]
pub enum RenderError {
    /// None of the sections the report is made of exist
    #[error("no research data available for the {0} report")]
    NoContent(ReportType),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Service trait for turning research results into report documents
pub trait ReportRenderer: Send + Sync {
    /// Renders a report into PDF bytes
    fn render(
        &self,
        report_type: ReportType,
        result: &ResearchResult,
    ) -> Result<Vec<u8>, RenderError>;

    /// Renders a report and writes it into `dir`
    fn write(
        &self,
        report_type: ReportType,
        result: &ResearchResult,
        dir: &Path,
    ) -> Result<GeneratedReport, RenderError> {
        let bytes = self.render(report_type, result)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(report_file_name(report_type, &result.topic));
        std::fs::write(&path, &bytes)?;

        Ok(GeneratedReport {
            report_type,
            path,
            size_bytes: bytes.len() as u64,
        })
    }

    /// Renderer name for logging
    fn name(&self) -> &str;
}

/// File name of a report: `mars_{type}_report_{topic-slug}.pdf`
pub fn report_file_name(report_type: ReportType, topic: &str) -> String {
    format!("mars_{}_report_{}.pdf", report_type, slug(topic))
}

fn slug(topic: &str) -> String {
    let mut slug = String::new();
    for c in topic.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "research".to_string()
    } else {
        slug.to_string()
    }
}

/// Renders reports with the built-in PDF writer
#[derive(Debug, Clone, Default)]
pub struct PdfReportRenderer {}

impl PdfReportRenderer {
    pub fn new() -> Self {
        Self {}
    }

    fn cover_page(&self, layout: &mut TextLayout, report_type: ReportType, result: &ResearchResult) {
        let date = result.completed_at.unwrap_or_else(Utc::now);

        layout.spacer(180.0);
        layout.centered(report_type.title(), Font::Bold, TITLE_SIZE);
        layout.spacer(12.0);
        layout.centered(&result.topic, Font::Regular, HEADING_SIZE);
        layout.spacer(36.0);
        layout.centered(
            &format!("Report type: {}", report_type.as_str()),
            Font::Regular,
            BODY_SIZE,
        );
        layout.centered(
            &format!("Date: {}", date.format("%B %d, %Y")),
            Font::Regular,
            BODY_SIZE,
        );
        layout.spacer(24.0);
        layout.centered(GENERATED_BY, Font::Regular, BODY_SIZE);
        layout.page_break();
    }

    fn section(&self, layout: &mut TextLayout, section: &Section, summary_only: bool) {
        layout.heading(&section.title, HEADING_SIZE);
        layout.paragraph(&strip_inline(&section.summary), BODY_SIZE);

        if !section.key_findings.is_empty() {
            layout.heading("Key Findings", SUBHEADING_SIZE);
            for finding in &section.key_findings {
                layout.bullet(&strip_inline(finding), BODY_SIZE);
            }
            layout.spacer(BODY_SIZE * 0.5);
        }

        if !summary_only {
            markdown(layout, &section.body);
        }
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(
        &self,
        report_type: ReportType,
        result: &ResearchResult,
    ) -> Result<Vec<u8>, RenderError> {
        let sections: Vec<&Section> = report_type
            .stages()
            .iter()
            .filter_map(|stage| result.section(*stage))
            .collect();
        if sections.is_empty() {
            return Err(RenderError::NoContent(report_type));
        }

        let mut layout = TextLayout::new();
        self.cover_page(&mut layout, report_type, result);
        for section in sections {
            self.section(&mut layout, section, report_type.is_summary());
        }

        let info = DocumentInfo {
            title: format!("{}: {}", report_type.title(), result.topic),
            producer: GENERATED_BY.to_string(),
            created: Utc::now(),
        };
        Ok(layout.finish(&info))
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Lays out a markdown body: headings, bullets and paragraphs
fn markdown(layout: &mut TextLayout, body: &str) {
    let mut paragraph: Vec<&str> = Vec::new();

    for line in body.lines().map(str::trim) {
        if line.is_empty() {
            flush(layout, &mut paragraph);
        } else if line.starts_with('#') {
            flush(layout, &mut paragraph);
            layout.heading(&strip_inline(line.trim_start_matches('#').trim()), SUBHEADING_SIZE);
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            flush(layout, &mut paragraph);
            layout.bullet(&strip_inline(item), BODY_SIZE);
        } else {
            paragraph.push(line);
        }
    }
    flush(layout, &mut paragraph);
}

fn flush(layout: &mut TextLayout, paragraph: &mut Vec<&str>) {
    if !paragraph.is_empty() {
        layout.paragraph(&strip_inline(&paragraph.join(" ")), BODY_SIZE);
        paragraph.clear();
    }
}

/// Removes inline emphasis and code markers
fn strip_inline(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .replace('*', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mars_core::domain::research::{ResearchRequest, StageName, StageOutput};

    fn section(stage: StageName) -> Section {
        Section {
            title: stage.title().to_string(),
            summary: format!("{} summary", stage),
            key_findings: vec!["first finding".to_string()],
            body: "## Heading\nSome **bold** text.\n\n- a bullet\n- another".to_string(),
        }
    }

    fn result_with(stages: &[StageName]) -> ResearchResult {
        let mut result = ResearchResult::new(&ResearchRequest::new("Quantum Batteries", "a@b.com"));
        for stage in stages {
            result.insert(*stage, StageOutput::Section(section(*stage)));
        }
        result
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(ReportType::Executive, "Quantum Batteries!"),
            "mars_executive_report_quantum_batteries.pdf"
        );
        assert_eq!(
            report_file_name(ReportType::Market, "  ***  "),
            "mars_market_report_research.pdf"
        );
        let long = report_file_name(ReportType::Technical, &"x".repeat(200));
        assert!(long.len() < 100);
    }

    #[test]
    fn test_render_every_report_type() {
        let renderer = PdfReportRenderer::new();
        let result = result_with(&StageName::RESEARCH);

        for report_type in ReportType::ALL {
            let pdf = renderer.render(report_type, &result).unwrap();
            assert!(pdf.starts_with(b"%PDF-1.4"));
            assert!(pdf.ends_with(b"%%EOF\n"));
        }
    }

    #[test]
    fn test_missing_sections_is_render_error() {
        let renderer = PdfReportRenderer::new();
        let result = result_with(&[StageName::Market]);

        assert!(renderer.render(ReportType::Market, &result).is_ok());
        let err = renderer.render(ReportType::Technical, &result).unwrap_err();
        assert!(matches!(err, RenderError::NoContent(ReportType::Technical)));
    }

    #[test]
    fn test_executive_report_is_smaller_than_comprehensive() {
        let renderer = PdfReportRenderer::new();
        let mut result = result_with(&StageName::RESEARCH);
        for stage in StageName::RESEARCH {
            if let Some(StageOutput::Section(section)) = result.sections.get_mut(&stage) {
                section.body = "detail ".repeat(400);
            }
        }

        let executive = renderer.render(ReportType::Executive, &result).unwrap();
        let comprehensive = renderer.render(ReportType::Comprehensive, &result).unwrap();
        assert!(executive.len() < comprehensive.len());
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfReportRenderer::new();
        let result = result_with(&StageName::RESEARCH);

        let report = renderer
            .write(ReportType::Comprehensive, &result, &dir.path().join("nested"))
            .unwrap();

        assert_eq!(report.report_type, ReportType::Comprehensive);
        assert!(report.path.ends_with("mars_comprehensive_report_quantum_batteries.pdf"));
        assert_eq!(std::fs::metadata(&report.path).unwrap().len(), report.size_bytes);
    }

    #[test]
    fn test_strip_inline() {
        assert_eq!(strip_inline("**bold** and `code` and *em*"), "bold and code and em");
    }
}
