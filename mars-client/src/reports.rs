//! Report download endpoints

use crate::MarsClient;
use crate::error::Result;
use mars_core::domain::report::ReportType;
use reqwest::header;

/// A downloaded PDF report
#[derive(Debug, Clone)]
pub struct ReportDownload {
    /// File name suggested by the server's Content-Disposition header
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl MarsClient {
    // =============================================================================
    // Reports
    // =============================================================================

    /// Download a report of the last successful job
    pub async fn download_report(&self, report_type: ReportType) -> Result<ReportDownload> {
        self.fetch_pdf(&format!("/download-pdf/{}", report_type)).await
    }

    /// Fetch a report through the inline viewing endpoint
    pub async fn view_report(&self, report_type: ReportType) -> Result<ReportDownload> {
        self.fetch_pdf(&format!("/view-pdf/{}", report_type)).await
    }

    async fn fetch_pdf(&self, path: &str) -> Result<ReportDownload> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let file_name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await?.to_vec();

        Ok(ReportDownload { file_name, bytes })
    }
}

/// Extract `filename="..."` from a Content-Disposition value
fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}
