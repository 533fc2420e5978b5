//! Shared job state
//!
//! The single record polled by the HTTP layer and written by the running job.
//! `active` is a lock-free flag so admission is one compare-and-swap; the
//! remaining fields sit behind a `std::sync::RwLock` that is only held for
//! plain field copies, never across an `.await`.

use chrono::{DateTime, Utc};
use mars_core::domain::job::JobOutcome;
use mars_core::domain::research::{ResearchResult, StageName};
use mars_core::dto::research::StatusResponse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::pipeline::ProgressSink;

pub const READY_MESSAGE: &str = "Ready";
pub const INITIALIZING_MESSAGE: &str = "Initializing research agents...";

#[derive(Debug)]
struct Inner {
    status_message: String,
    job_id: Option<Uuid>,
    current_stage: Option<StageName>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    last_outcome: Option<JobOutcome>,
    result: Option<Arc<ResearchResult>>,
}

/// Process-wide job state
///
/// Created once at startup and shared through an `Arc` by the runner and the
/// HTTP handlers.
#[derive(Debug)]
pub struct JobState {
    active: AtomicBool,
    inner: RwLock<Inner>,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            inner: RwLock::new(Inner {
                status_message: READY_MESSAGE.to_string(),
                job_id: None,
                current_stage: None,
                started_at: None,
                finished_at: None,
                last_outcome: None,
                result: None,
            }),
        }
    }

    /// Whether a job is currently executing
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Current human-readable status
    pub fn status_message(&self) -> String {
        self.read().status_message.clone()
    }

    /// Stage the running job is executing, if any
    pub fn current_stage(&self) -> Option<StageName> {
        self.read().current_stage
    }

    /// Outcome of the last finished job
    pub fn last_outcome(&self) -> Option<JobOutcome> {
        self.read().last_outcome.clone()
    }

    /// Result of the last successful job
    pub fn result(&self) -> Option<Arc<ResearchResult>> {
        self.read().result.clone()
    }

    /// Consistent-enough view for polling clients
    ///
    /// `is_running` and the other fields are read separately, so a poller may
    /// briefly see a terminal message with `is_running == true`.
    pub fn snapshot(&self) -> StatusResponse {
        let is_running = self.is_active();
        let inner = self.read();
        StatusResponse {
            is_running,
            status: inner.status_message.clone(),
            job_id: inner.job_id,
            current_stage: inner.current_stage,
            started_at: inner.started_at,
            finished_at: inner.finished_at,
            last_outcome: inner.last_outcome.clone(),
        }
    }

    /// Atomically claims the active flag
    ///
    /// Returns `None` without touching any state when a job is already active.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<ActiveGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActiveGuard {
                state: Arc::clone(self),
            })
    }

    pub(crate) fn begin(&self, job_id: Uuid) {
        let mut inner = self.write();
        inner.status_message = INITIALIZING_MESSAGE.to_string();
        inner.job_id = Some(job_id);
        inner.current_stage = None;
        inner.started_at = Some(Utc::now());
        inner.finished_at = None;
    }

    pub(crate) fn enter_stage(&self, stage: StageName) {
        let mut inner = self.write();
        inner.status_message = stage.status_message().to_string();
        inner.current_stage = Some(stage);
    }

    /// Publishes a finished result as a whole and records success
    pub(crate) fn succeed(&self, result: ResearchResult, message: String) {
        let mut inner = self.write();
        inner.result = Some(Arc::new(result));
        inner.status_message = non_empty(message);
        inner.current_stage = None;
        inner.finished_at = Some(Utc::now());
        inner.last_outcome = Some(JobOutcome::Succeeded);
    }

    /// Records a failure; the previous result stays published
    pub(crate) fn fail(&self, outcome: JobOutcome, message: String) {
        let mut inner = self.write();
        inner.status_message = non_empty(message);
        inner.current_stage = None;
        inner.finished_at = Some(Utc::now());
        inner.last_outcome = Some(outcome);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::error!("Job state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::error!("Job state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for JobState {
    fn stage_started(&self, stage: StageName) {
        self.enter_stage(stage);
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        "Finished".to_string()
    } else {
        message
    }
}

/// Ownership of the active flag
///
/// Dropping the guard clears the flag, so every exit path of the supervising
/// task (including unwinding) releases it.
#[derive(Debug)]
pub(crate) struct ActiveGuard {
    state: Arc<JobState>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.state.active.store(false, Ordering::Release);
    }
}
