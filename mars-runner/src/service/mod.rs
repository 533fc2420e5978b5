//! Service layer
//!
//! Collaborators of the research pipeline: content generation, report
//! rendering and mail delivery.
//!
//! All services are trait-based to enable testing and dependency injection.

mod content;
mod gmail;
mod llm;
mod mail;
mod report;

// Re-export traits
pub use content::ContentGenerator;
pub use mail::Mailer;
pub use report::ReportRenderer;

// Re-export implementations
pub use content::TemplateGenerator;
pub use gmail::GmailMailer;
pub use llm::ChatCompletionGenerator;
pub use mail::OutboxMailer;
pub use report::PdfReportRenderer;

// Re-export supporting types
pub use content::GenerateError;
pub use mail::{Attachment, Email, MailError, build_mime_message};
pub use report::{RenderError, report_file_name};
