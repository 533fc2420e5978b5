//! Report API Handlers
//!
//! Serve the PDF reports of the last successful job.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use mars_core::domain::report::ReportType;

use crate::api::error::{ApiError, ApiResult};
use crate::service::report_service;
use crate::state::SharedState;

#[derive(Debug, Clone, Copy)]
enum Disposition {
    Attachment,
    Inline,
}

/// GET /download-pdf/{type}
/// Download a report as an attachment
pub async fn download_pdf(
    State(state): State<SharedState>,
    Path(report_type): Path<String>,
) -> ApiResult<Response> {
    serve_pdf(&state, &report_type, Disposition::Attachment).await
}

/// GET /view-pdf/{type}
/// Display a report inline in the browser
pub async fn view_pdf(
    State(state): State<SharedState>,
    Path(report_type): Path<String>,
) -> ApiResult<Response> {
    serve_pdf(&state, &report_type, Disposition::Inline).await
}

async fn serve_pdf(
    state: &SharedState,
    report_type: &str,
    disposition: Disposition,
) -> ApiResult<Response> {
    let report_type: ReportType = report_type
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown report type: {}", report_type)))?;

    let report = report_service::render_report(state, report_type)
        .await
        .map_err(|e| match e {
            report_service::ReportError::NoData => {
                ApiError::NotFound("No research data available".to_string())
            }
            report_service::ReportError::EmptyReport(report_type) => {
                ApiError::NotFound(format!("No data available for the {} report", report_type))
            }
            report_service::ReportError::Render(msg) => {
                ApiError::InternalError(format!("Error generating PDF: {}", msg))
            }
        })?;

    let disposition = match disposition {
        Disposition::Attachment => format!("attachment; filename=\"{}\"", report.file_name),
        Disposition::Inline => format!("inline; filename=\"{}\"", report.file_name),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.bytes,
    )
        .into_response())
}
