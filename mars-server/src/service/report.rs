//! Report Service
//!
//! Renders PDF reports of the last successful research result on demand.

use mars_core::domain::report::ReportType;
use mars_runner::service::{RenderError, report_file_name};

use crate::state::AppState;

/// Service error type
#[derive(Debug)]
pub enum ReportError {
    /// No research has completed yet
    NoData,
    /// The result holds no section for this report
    EmptyReport(ReportType),
    Render(String),
}

/// A rendered report ready to be served
#[derive(Debug)]
pub struct RenderedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Renders a report from the last successful result
pub async fn render_report(
    state: &AppState,
    report_type: ReportType,
) -> Result<RenderedReport, ReportError> {
    let result = state.runner.result().ok_or(ReportError::NoData)?;
    let renderer = state.renderer.clone();
    let file_name = report_file_name(report_type, &result.topic);

    let bytes = tokio::task::spawn_blocking(move || renderer.render(report_type, &result))
        .await
        .map_err(|e| ReportError::Render(format!("renderer task failed: {}", e)))?
        .map_err(|e| match e {
            RenderError::NoContent(report_type) => ReportError::EmptyReport(report_type),
            other => ReportError::Render(other.to_string()),
        })?;

    tracing::debug!("Rendered {} ({} bytes)", file_name, bytes.len());

    Ok(RenderedReport { file_name, bytes })
}
