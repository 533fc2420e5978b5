//! Job domain types

use serde::{Deserialize, Serialize};

use crate::domain::research::StageName;

/// Terminal outcome of a research job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed {
        /// Stage that was executing when the job failed, if any
        stage: Option<StageName>,
        kind: StageErrorKind,
        message: String,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

/// Classification of a stage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// A content generator failed to produce a section
    Content,
    /// The PDF renderer failed
    Render,
    /// The mail sender failed
    Delivery,
    /// The stage exceeded its deadline
    Timeout,
    /// The job body panicked
    Panicked,
}

impl std::fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageErrorKind::Content => "content",
            StageErrorKind::Render => "render",
            StageErrorKind::Delivery => "delivery",
            StageErrorKind::Timeout => "timeout",
            StageErrorKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}
