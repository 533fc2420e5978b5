//! Research Service
//!
//! Validates submissions and hands them to the job runner.

use mars_core::domain::research::{InvalidRequest, ResearchRequest};
use mars_runner::{Admission, JobRunner};
use uuid::Uuid;

/// Service error type
#[derive(Debug, PartialEq, Eq)]
pub enum ResearchError {
    MissingFields,
    ControlCharacters,
    InvalidEmail(String),
    AlreadyRunning,
}

impl From<InvalidRequest> for ResearchError {
    fn from(err: InvalidRequest) -> Self {
        match err {
            InvalidRequest::MissingFields => ResearchError::MissingFields,
            InvalidRequest::ControlCharacters => ResearchError::ControlCharacters,
            InvalidRequest::InvalidEmail(email) => ResearchError::InvalidEmail(email),
        }
    }
}

/// Validates and submits a research request
///
/// Returns the id of the admitted job without waiting for it.
pub fn submit_request(
    runner: &JobRunner,
    topic: &str,
    recipient_email: &str,
) -> Result<Uuid, ResearchError> {
    let request = ResearchRequest::validated(topic, recipient_email)?;

    match runner.submit(request) {
        Admission::Accepted(handle) => Ok(handle.id()),
        Admission::Rejected => Err(ResearchError::AlreadyRunning),
    }
}
