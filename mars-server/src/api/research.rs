//! Research API Handlers
//!
//! Job submission, status polling and access to the last result.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use mars_core::domain::research::ResearchResult;
use mars_core::dto::research::{MessageResponse, StartResearch, StatusResponse};

use crate::api::error::{ApiError, ApiResult};
use crate::service::research_service;
use crate::state::SharedState;

/// POST /start-research
/// Admit a research job and return immediately
pub async fn start_research(
    State(state): State<SharedState>,
    payload: Result<Json<StartResearch>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let job_id = research_service::submit_request(&state.runner, &req.topic, &req.recipient_email)
        .map_err(|e| match e {
            research_service::ResearchError::MissingFields => {
                ApiError::BadRequest("Topic and recipient email are required".to_string())
            }
            research_service::ResearchError::ControlCharacters => ApiError::BadRequest(
                "Topic and recipient email must not contain control characters".to_string(),
            ),
            research_service::ResearchError::InvalidEmail(email) => {
                ApiError::BadRequest(format!("Invalid recipient email: {}", email))
            }
            research_service::ResearchError::AlreadyRunning => {
                ApiError::BadRequest("Research is already running".to_string())
            }
        })?;

    tracing::info!("Research job {} started on '{}'", job_id, req.topic.trim());

    Ok(Json(MessageResponse {
        message: "Research started successfully".to_string(),
    }))
}

/// GET /status
/// Current job status snapshot
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(state.runner.status())
}

/// GET /result
/// Result of the last successful job
pub async fn get_result(State(state): State<SharedState>) -> ApiResult<Json<ResearchResult>> {
    let result = state
        .runner
        .result()
        .ok_or_else(|| ApiError::NotFound("No research data available".to_string()))?;

    Ok(Json(ResearchResult::clone(&result)))
}
