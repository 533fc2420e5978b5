//! Research-related API endpoints

use crate::error::{ClientError, Result};
use crate::MarsClient;
use mars_core::domain::research::ResearchResult;
use mars_core::dto::research::{MessageResponse, StartResearch, StatusResponse};
use std::time::Duration;

impl MarsClient {
    // =============================================================================
    // Research Jobs
    // =============================================================================

    /// Start a research job
    ///
    /// Returns as soon as the server admitted the job. A job that is already
    /// running is reported as a 400 `ApiError`.
    pub async fn start_research(&self, topic: &str, recipient_email: &str) -> Result<MessageResponse> {
        let body = StartResearch {
            topic: topic.to_string(),
            recipient_email: recipient_email.to_string(),
        };
        let response = self
            .authorize(self.client.post(self.url("/start-research")))
            .json(&body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the current job status
    pub async fn status(&self) -> Result<StatusResponse> {
        let response = self
            .authorize(self.client.get(self.url("/status")))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the result of the last successful job
    pub async fn result(&self) -> Result<ResearchResult> {
        let response = self
            .authorize(self.client.get(self.url("/result")))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Poll the status until no job is running
    ///
    /// # Arguments
    /// * `interval` - Delay between polls
    /// * `max_polls` - Give up after this many polls (`None` waits forever)
    /// * `on_status` - Called with every snapshot, e.g. to print progress
    pub async fn wait_until_idle<F>(
        &self,
        interval: Duration,
        max_polls: Option<usize>,
        mut on_status: F,
    ) -> Result<StatusResponse>
    where
        F: FnMut(&StatusResponse),
    {
        let mut polls = 0;
        loop {
            let status = self.status().await?;
            polls += 1;
            on_status(&status);

            if !status.is_running {
                return Ok(status);
            }
            if max_polls.is_some_and(|max| polls >= max) {
                return Err(ClientError::Timeout(polls));
            }

            tracing::debug!("Job still running: {}", status.status);
            tokio::time::sleep(interval).await;
        }
    }
}
