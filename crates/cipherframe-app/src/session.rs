//! One wizard-to-metrics session.

use std::sync::Arc;

use async_trait::async_trait;
use cipherframe_core::{EvaluationRequest, JobRequest, JobResult};
use cipherframe_engine::{EngineTransport, HaltAcknowledgement, JobOrchestrator, JobOutcome};
use cipherframe_metrics::{FileReport, MetricDataset, MetricsError, analyze_result};
use cipherframe_wizard::{PageTransition, Wizard};
use tracing::{info, warn};

use crate::{AppConfig, AppError, RuntimeStatus, project_status};

/// Capability that loads the per-frame dataset written by the engine.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Loads and parses the dataset at `path`.
    async fn load(&self, path: &str) -> Result<MetricDataset, MetricsError>;
}

/// [`DatasetSource`] reading CSV files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDatasetSource;

#[async_trait]
impl DatasetSource for FsDatasetSource {
    async fn load(&self, path: &str) -> Result<MetricDataset, MetricsError> {
        let bytes = tokio::fs::read(path).await?;
        MetricDataset::from_csv_reader(bytes.as_slice())
    }
}

/// Everything a finished session run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Outcome of the processing job.
    pub processing: JobOutcome,
    /// Outcome of the follow-up evaluation job, when one ran.
    pub evaluation: Option<JobOutcome>,
    /// Metric reports per input file.
    pub files: Vec<FileReport>,
    /// Why metric reports are missing after a successful evaluation.
    pub metrics_error: Option<String>,
}

impl SessionReport {
    fn processing_only(processing: JobOutcome) -> Self {
        Self {
            processing,
            evaluation: None,
            files: Vec::new(),
            metrics_error: None,
        }
    }
}

/// Wizard, orchestrator and metrics glued into one user session.
pub struct Session {
    config: AppConfig,
    wizard: Wizard,
    orchestrator: JobOrchestrator,
    datasets: Arc<dyn DatasetSource>,
    last_request: Option<JobRequest>,
}

impl Session {
    /// Creates a session around a configured wizard.
    pub fn new(
        config: AppConfig,
        wizard: Wizard,
        transport: Arc<dyn EngineTransport>,
        datasets: Arc<dyn DatasetSource>,
    ) -> Self {
        let orchestrator = JobOrchestrator::new(transport, config.orchestrator());
        Self {
            config,
            wizard,
            orchestrator,
            datasets,
            last_request: None,
        }
    }

    /// Wizard collecting the job inputs.
    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    /// Mutable wizard access for input events.
    pub fn wizard_mut(&mut self) -> &mut Wizard {
        &mut self.wizard
    }

    /// Orchestrator handle; clone it to halt from another task.
    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    /// Current display status.
    pub fn status(&self) -> RuntimeStatus {
        project_status(&self.orchestrator.snapshot())
    }

    /// Leaves the current wizard page; runs the job once the wizard submits.
    ///
    /// Returns `None` when the wizard only advanced a page.
    ///
    /// # Errors
    /// Returns [`AppError::Wizard`] when the page is invalid and
    /// [`AppError::Orchestrator`] when a job is already in flight.
    pub async fn submit_page(&mut self) -> Result<Option<SessionReport>, AppError> {
        match self.wizard.submit_page().await? {
            PageTransition::Advanced(_) => Ok(None),
            PageTransition::Submitted(request) => self.run(request).await.map(Some),
        }
    }

    /// Runs the processing job and, when enabled, the evaluation job.
    ///
    /// # Errors
    /// Returns [`AppError::Orchestrator`] when a job is already in flight.
    pub async fn run(&mut self, request: JobRequest) -> Result<SessionReport, AppError> {
        self.last_request = Some(request.clone());
        let algorithm = request.algorithm();
        let processing = self.orchestrator.run(request).await?;

        let JobOutcome::Success(result) = &processing else {
            return Ok(SessionReport::processing_only(processing));
        };
        if !self.config.evaluate {
            info!("evaluation disabled; skipping metrics");
            return Ok(SessionReport::processing_only(processing));
        }

        let evaluation_request = match EvaluationRequest::from_result(result, algorithm) {
            Ok(evaluation_request) => evaluation_request,
            Err(error) => {
                warn!(%error, "processing result cannot be evaluated");
                let mut report = SessionReport::processing_only(processing);
                report.metrics_error = Some(error.to_string());
                return Ok(report);
            }
        };

        let evaluation = self.orchestrator.run(evaluation_request).await?;
        let mut report = SessionReport::processing_only(processing);
        if let JobOutcome::Success(evaluated) = &evaluation {
            match self.load_reports(evaluated).await {
                Ok(files) => {
                    info!(files = files.len(), "metric reports ready");
                    report.files = files;
                }
                Err(error) => {
                    warn!(%error, "metric datasets unusable");
                    report.metrics_error = Some(error.to_string());
                }
            }
        }
        report.evaluation = Some(evaluation);
        Ok(report)
    }

    /// Resubmits the last request ("Try Again").
    ///
    /// # Errors
    /// Returns [`AppError::NothingToRetry`] before the first run.
    pub async fn try_again(&mut self) -> Result<SessionReport, AppError> {
        let request = self.last_request.clone().ok_or(AppError::NothingToRetry)?;
        self.run(request).await
    }

    /// Discards the session and returns to the first wizard page ("Return Home").
    ///
    /// # Errors
    /// Returns [`AppError::Orchestrator`] while a job is in flight.
    pub fn return_home(&mut self) -> Result<(), AppError> {
        self.orchestrator.reset()?;
        self.wizard.reset();
        self.last_request = None;
        Ok(())
    }

    /// Halts the in-flight job.
    ///
    /// # Errors
    /// Returns [`AppError::Orchestrator`] when nothing is in flight.
    pub fn halt(&self) -> Result<HaltAcknowledgement, AppError> {
        Ok(self.orchestrator.halt()?)
    }

    async fn load_reports(&self, evaluated: &JobResult) -> Result<Vec<FileReport>, MetricsError> {
        let mut datasets = Vec::with_capacity(evaluated.dataset_paths.len());
        for path in &evaluated.dataset_paths {
            datasets.push(self.datasets.load(path).await?);
        }
        analyze_result(evaluated, &datasets)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("wizard_state", &self.wizard.state())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
