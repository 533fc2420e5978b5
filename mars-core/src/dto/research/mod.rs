//! Research DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobOutcome;
use crate::domain::research::StageName;

/// Request to start a research job
///
/// Missing fields deserialize as empty strings and are rejected by the
/// submission validation with a 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartResearch {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub recipient_email: String,
}

/// Generic `{message}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Generic `{error}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Snapshot of the job state returned by `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub is_running: bool,
    pub status: String,
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default)]
    pub current_stage: Option<StageName>,
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_outcome: Option<JobOutcome>,
}
