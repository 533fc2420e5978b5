//! Research pipeline
//!
//! The job body: runs the fixed stage list strictly in order, reporting each
//! stage before it starts and folding every stage's fragment into a job-local
//! result that later stages can read.

use anyhow::Context;
use mars_core::domain::job::{JobOutcome, StageErrorKind};
use mars_core::domain::report::ReportType;
use mars_core::domain::research::{ResearchRequest, ResearchResult, StageName, StageOutput};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::service::{
    ChatCompletionGenerator, ContentGenerator, Email, GmailMailer, Mailer, OutboxMailer,
    PdfReportRenderer, RenderError, ReportRenderer, TemplateGenerator,
};

/// Receives stage transitions of a running pipeline
pub trait ProgressSink: Send + Sync {
    /// Called right before a stage starts executing
    fn stage_started(&self, stage: StageName);
}

/// A failed stage
#[derive(Debug, Clone, Error)]
#[error("{stage} stage failed: {message}")]
pub struct StageError {
    pub stage: StageName,
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(stage: StageName, kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    fn timeout(stage: StageName, after: Duration) -> Self {
        Self::new(
            stage,
            StageErrorKind::Timeout,
            format!("timed out after {}s", after.as_secs_f64()),
        )
    }

    /// Terminal outcome recorded for this failure
    pub fn outcome(&self) -> JobOutcome {
        JobOutcome::Failed {
            stage: Some(self.stage),
            kind: self.kind,
            message: self.message.clone(),
        }
    }
}

/// Tunables of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory PDF reports are written to
    pub output_dir: PathBuf,
    /// Deadline applied to each stage
    pub stage_timeout: Duration,
    /// Pause before each stage
    pub stage_delay: Duration,
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            stage_timeout: config.stage_timeout,
            stage_delay: config.stage_delay,
        }
    }
}

/// The research job body and its collaborators
pub struct ResearchPipeline {
    generator: Arc<dyn ContentGenerator>,
    renderer: Arc<dyn ReportRenderer>,
    mailer: Arc<dyn Mailer>,
    options: PipelineOptions,
}

impl ResearchPipeline {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn ReportRenderer>,
        mailer: Arc<dyn Mailer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            generator,
            renderer,
            mailer,
            options,
        }
    }

    /// Builds a pipeline with the collaborators selected by the configuration
    ///
    /// The chat-completion generator is used when an API key is configured,
    /// the Gmail mailer when OAuth credentials are configured; otherwise the
    /// canned templates and the local outbox are used.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let generator: Arc<dyn ContentGenerator> = match &config.llm {
            Some(llm) => Arc::new(
                ChatCompletionGenerator::new(llm.clone())
                    .context("Failed to create chat-completion generator")?,
            ),
            None => Arc::new(TemplateGenerator::new()),
        };

        let mailer: Arc<dyn Mailer> = match &config.gmail {
            Some(credentials) => Arc::new(GmailMailer::new(credentials.clone())),
            None => Arc::new(OutboxMailer::new(config.outbox_dir.clone())),
        };

        info!(
            "Pipeline collaborators: generator={}, mailer={}",
            generator.name(),
            mailer.name()
        );

        Ok(Self::new(
            generator,
            Arc::new(PdfReportRenderer::new()),
            mailer,
            PipelineOptions::from(config),
        ))
    }

    /// Renderer shared with the report download endpoints
    pub fn renderer(&self) -> Arc<dyn ReportRenderer> {
        Arc::clone(&self.renderer)
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs every stage in order
    ///
    /// Returns the completed result, or the first stage error.
    pub async fn run(
        &self,
        job_id: Uuid,
        request: ResearchRequest,
        progress: &dyn ProgressSink,
    ) -> Result<ResearchResult, StageError> {
        info!(
            "Starting research job {} on '{}' for {}",
            job_id, request.topic, request.recipient_email
        );

        let mut result = ResearchResult::new(&request);

        for stage in StageName::ALL {
            progress.stage_started(stage);
            info!(
                "Job {}: executing stage {}/{}: {}",
                job_id,
                stage.position(),
                StageName::ALL.len(),
                stage
            );

            if !self.options.stage_delay.is_zero() {
                tokio::time::sleep(self.options.stage_delay).await;
            }

            let output = tokio::time::timeout(
                self.options.stage_timeout,
                self.execute_stage(stage, &request, &result),
            )
            .await
            .map_err(|_| StageError::timeout(stage, self.options.stage_timeout))??;

            debug!("Job {}: stage '{}' completed", job_id, stage);
            result.insert(stage, output);
        }

        result.completed_at = Some(chrono::Utc::now());
        info!("Research job {} completed successfully", job_id);

        Ok(result)
    }

    /// Executes a single stage against the fragments gathered so far
    async fn execute_stage(
        &self,
        stage: StageName,
        request: &ResearchRequest,
        result: &ResearchResult,
    ) -> Result<StageOutput, StageError> {
        match stage {
            StageName::PdfGeneration => self.generate_reports(result).await,
            StageName::EmailDelivery => self.deliver(request, result).await,
            research => self
                .generator
                .generate(research, result)
                .await
                .map(StageOutput::Section)
                .map_err(|e| StageError::new(research, StageErrorKind::Content, e.to_string())),
        }
    }

    async fn generate_reports(&self, result: &ResearchResult) -> Result<StageOutput, StageError> {
        let renderer = Arc::clone(&self.renderer);
        let output_dir = self.options.output_dir.clone();
        let snapshot = result.clone();

        // Set when this future is dropped, e.g. by the stage deadline
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancelled));

        let reports = tokio::task::spawn_blocking(move || {
            let mut reports = Vec::with_capacity(ReportType::ALL.len());
            for report_type in ReportType::ALL {
                if cancelled.load(Ordering::SeqCst) {
                    debug!("Report rendering abandoned before the {} report", report_type);
                    break;
                }
                reports.push(renderer.write(report_type, &snapshot, &output_dir)?);
            }
            Ok::<_, RenderError>(reports)
        })
        .await
        .map_err(|e| {
            StageError::new(
                StageName::PdfGeneration,
                StageErrorKind::Render,
                format!("renderer task failed: {}", e),
            )
        })?
        .map_err(|e| StageError::new(StageName::PdfGeneration, StageErrorKind::Render, e.to_string()))?;

        for report in &reports {
            debug!(
                "Generated {} report at {} ({} bytes)",
                report.report_type,
                report.path.display(),
                report.size_bytes
            );
        }

        Ok(StageOutput::Reports { reports })
    }

    async fn deliver(
        &self,
        request: &ResearchRequest,
        result: &ResearchResult,
    ) -> Result<StageOutput, StageError> {
        let attachments: Vec<PathBuf> = result.reports().iter().map(|r| r.path.clone()).collect();
        if attachments.is_empty() {
            warn!("No reports to attach for {}", request.recipient_email);
        }

        let email = Email {
            to: request.recipient_email.clone(),
            subject: format!("MARS Research Report: {}", request.topic),
            body: compose_body(result),
            attachments,
        };

        let receipt = self.mailer.send(&email).await.map_err(|e| {
            StageError::new(StageName::EmailDelivery, StageErrorKind::Delivery, e.to_string())
        })?;

        info!(
            "Delivered research package to {} (message id {})",
            receipt.recipient, receipt.message_id
        );

        Ok(StageOutput::Delivery(receipt))
    }
}

struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Plain-text mail body summarising the research
fn compose_body(result: &ResearchResult) -> String {
    let mut body = format!(
        "Hello,\n\nThe MARS research package on \"{}\" is ready.\n\n",
        result.topic
    );

    for stage in StageName::RESEARCH {
        if let Some(section) = result.section(stage) {
            body.push_str(&format!("{}\n{}\n\n", section.title, section.summary));
        }
    }

    let reports = result.reports();
    if !reports.is_empty() {
        body.push_str("Attached reports:\n");
        for report in reports {
            body.push_str(&format!("  - {}\n", report.report_type.title()));
        }
        body.push('\n');
    }

    body.push_str("Generated by MARS - Multi-Agent Research System\n");
    body
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_pipeline_runs_every_stage_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = pipeline(Arc::new(ScriptedGenerator::ok()), mailer.clone(), dir.path());
        let progress = RecordingProgress::default();

        let result = pipeline
            .run(
                Uuid::new_v4(),
                ResearchRequest::new("Quantum Batteries", "a@b.com"),
                &progress,
            )
            .await
            .unwrap();

        assert_eq!(*progress.stages.lock().unwrap(), StageName::ALL.to_vec());
        assert!(result.is_complete());
        assert!(result.completed_at.is_some());
        assert_eq!(result.reports().len(), ReportType::ALL.len());
        for report in result.reports() {
            assert!(report.path.exists());
        }

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.com");
        assert!(sent[0].subject.contains("Quantum Batteries"));
        assert_eq!(sent[0].attachments.len(), ReportType::ALL.len());
        assert_eq!(result.delivery().unwrap().attachments, 4);
    }

    #[tokio::test]
    async fn test_content_failure_stops_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator {
            fail_at: Some(StageName::Patent),
            ..ScriptedGenerator::ok()
        });
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = pipeline(generator, mailer.clone(), dir.path());
        let progress = RecordingProgress::default();

        let err = pipeline
            .run(Uuid::new_v4(), ResearchRequest::new("Topic", "a@b.com"), &progress)
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageName::Patent);
        assert_eq!(err.kind, StageErrorKind::Content);
        assert_eq!(progress.stages.lock().unwrap().last(), Some(&StageName::Patent));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        });
        let pipeline = pipeline(Arc::new(ScriptedGenerator::ok()), mailer, dir.path());

        let err = pipeline
            .run(
                Uuid::new_v4(),
                ResearchRequest::new("Topic", "a@b.com"),
                &RecordingProgress::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageName::EmailDelivery);
        assert_eq!(err.kind, StageErrorKind::Delivery);
        assert!(err.to_string().contains("email-delivery stage failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator {
            stall_at: Some(StageName::Market),
            ..ScriptedGenerator::ok()
        });
        let pipeline = pipeline(generator, Arc::new(RecordingMailer::default()), dir.path());

        let err = pipeline
            .run(
                Uuid::new_v4(),
                ResearchRequest::new("Topic", "a@b.com"),
                &RecordingProgress::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageName::Market);
        assert_eq!(err.kind, StageErrorKind::Timeout);
    }

    /// Renderer that takes a while per report and counts finished writes
    struct SlowRenderer {
        inner: PdfReportRenderer,
        delay: Duration,
        rendered: AtomicUsize,
    }

    impl ReportRenderer for SlowRenderer {
        fn render(
            &self,
            report_type: ReportType,
            result: &ResearchResult,
        ) -> Result<Vec<u8>, RenderError> {
            std::thread::sleep(self.delay);
            let bytes = self.inner.render(report_type, result)?;
            self.rendered.fetch_add(1, Ordering::SeqCst);
            Ok(bytes)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_rendering_stops_after_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(SlowRenderer {
            inner: PdfReportRenderer::new(),
            delay: Duration::from_millis(300),
            rendered: AtomicUsize::new(0),
        });
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = ResearchPipeline::new(
            Arc::new(ScriptedGenerator::ok()),
            renderer.clone(),
            mailer.clone(),
            PipelineOptions {
                stage_timeout: Duration::from_millis(100),
                ..options(dir.path())
            },
        );

        let err = pipeline
            .run(
                Uuid::new_v4(),
                ResearchRequest::new("Topic", "a@b.com"),
                &RecordingProgress::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, StageName::PdfGeneration);
        assert_eq!(err.kind, StageErrorKind::Timeout);

        // The report in flight finishes; the remaining ones are never rendered
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(renderer.rendered.load(Ordering::SeqCst), 1);
        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(written <= 1);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_compose_body_lists_sections() {
        let mut result = ResearchResult::new(&ResearchRequest::new("Topic", "a@b.com"));
        result.insert(
            StageName::Market,
            StageOutput::Section(mars_core::domain::research::Section {
                title: "Market Analysis".to_string(),
                summary: "Growing fast.".to_string(),
                key_findings: Vec::new(),
                body: String::new(),
            }),
        );

        let body = compose_body(&result);
        assert!(body.contains("\"Topic\""));
        assert!(body.contains("Market Analysis\nGrowing fast."));
    }
}
