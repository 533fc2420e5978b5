//! MARS Runner
//!
//! Single-flight research job runner.
//!
//! Architecture:
//! - Configuration: load settings from environment or defaults
//! - State: the shared job state polled by the HTTP layer
//! - Runner: atomic admission and background supervision of one job at a time
//! - Pipeline: the fixed, sequential stage list that makes up a research job
//! - Services: content generation, PDF rendering and mail delivery

pub mod config;
pub mod pdf;
pub mod pipeline;
pub mod runner;
pub mod service;
pub mod state;

pub use config::Config;
pub use pipeline::{PipelineOptions, ProgressSink, ResearchPipeline, StageError};
pub use runner::{Admission, JobHandle, JobRunner};
pub use state::JobState;
