//! Service Module
//!
//! Business logic between the HTTP handlers and the job runner.

pub mod report;
pub mod research;
pub mod session;

// Re-export for convenience
pub use report as report_service;
pub use research as research_service;
