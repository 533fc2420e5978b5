//! Job runner
//!
//! Admits at most one research job at a time and executes it on a background
//! task. A supervising task owns the active flag and records the terminal
//! status whether the job body returns, fails or panics.

use mars_core::domain::job::{JobOutcome, StageErrorKind};
use mars_core::domain::research::{ResearchRequest, ResearchResult};
use mars_core::dto::research::StatusResponse;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::ResearchPipeline;
use crate::state::JobState;

/// Result of a submission
#[derive(Debug)]
pub enum Admission {
    /// The job was admitted and is running in the background
    Accepted(JobHandle),
    /// Another job is active; nothing was changed
    Rejected,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted(_))
    }
}

/// Handle to an admitted job
///
/// Dropping the handle does not affect the job.
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    join: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits until the job reaches a terminal state
    pub async fn wait(self) -> JobOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::Failed {
                stage: None,
                kind: StageErrorKind::Panicked,
                message: format!("job supervisor failed: {}", e),
            },
        }
    }
}

/// Single-flight research job runner
#[derive(Clone)]
pub struct JobRunner {
    state: Arc<JobState>,
    pipeline: Arc<ResearchPipeline>,
}

impl JobRunner {
    pub fn new(state: Arc<JobState>, pipeline: Arc<ResearchPipeline>) -> Self {
        Self { state, pipeline }
    }

    pub fn state(&self) -> &Arc<JobState> {
        &self.state
    }

    pub fn pipeline(&self) -> &Arc<ResearchPipeline> {
        &self.pipeline
    }

    pub fn status(&self) -> StatusResponse {
        self.state.snapshot()
    }

    /// Result of the last successful job
    pub fn result(&self) -> Option<Arc<ResearchResult>> {
        self.state.result()
    }

    /// Admits a job if none is active and starts it in the background
    ///
    /// Returns immediately; the job body never runs on the caller's task.
    pub fn submit(&self, request: ResearchRequest) -> Admission {
        let Some(guard) = self.state.try_acquire() else {
            warn!(
                "Rejected research request on '{}': a job is already running",
                request.topic
            );
            return Admission::Rejected;
        };

        let job_id = Uuid::new_v4();
        self.state.begin(job_id);
        info!("Accepted research job {} on '{}'", job_id, request.topic);

        let state = Arc::clone(&self.state);
        let pipeline = Arc::clone(&self.pipeline);

        let join = tokio::spawn(async move {
            // Held until the terminal status is recorded
            let _guard = guard;
            let recipient = request.recipient_email.clone();

            let body_state = Arc::clone(&state);
            let body = tokio::spawn(async move {
                pipeline.run(job_id, request, &*body_state).await
            });

            match body.await {
                Ok(Ok(result)) => {
                    state.succeed(
                        result,
                        format!("Research completed! Reports sent to {}", recipient),
                    );
                    info!("Research job {} succeeded", job_id);
                    JobOutcome::Succeeded
                }
                Ok(Err(e)) => {
                    error!("Research job {} failed: {}", job_id, e);
                    let outcome = e.outcome();
                    state.fail(outcome.clone(), format!("Error: {}", e));
                    outcome
                }
                Err(e) => {
                    let stage = state.current_stage();
                    let message = if e.is_panic() {
                        "job panicked".to_string()
                    } else {
                        format!("job task aborted: {}", e)
                    };
                    error!("Research job {} crashed: {}", job_id, message);
                    let outcome = JobOutcome::Failed {
                        stage,
                        kind: StageErrorKind::Panicked,
                        message: message.clone(),
                    };
                    state.fail(outcome.clone(), format!("Error: {}", message));
                    outcome
                }
            }
        });

        Admission::Accepted(JobHandle { id: job_id, join })
    }
}
