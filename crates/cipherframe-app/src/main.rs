#![warn(missing_docs)]
//! # cipherframe binary
//!
//! Command-line entry point: fills the wizard from arguments, runs the job
//! against the configured engine, and prints the outcome with metric reports.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cipherframe_app::{
    AppConfig, AppError, FsDatasetSource, Session, SessionReport, app_version, init_tracing,
    redact_sensitive,
};
use cipherframe_core::{Algorithm, JobKind};
use cipherframe_engine::{HttpEngineTransport, JobOrchestrator, JobOutcome};
use cipherframe_metrics::{FileReport, MetricValue};
use cipherframe_validate::PathProbe;
use cipherframe_wizard::{FieldId, NoDialogs, Wizard, WizardError};
use clap::{Args, Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "cipherframe")]
#[command(about = "Submit video encryption jobs to the processing engine")]
#[command(version = app_version())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt plain videos
    Encrypt(JobArgs),
    /// Decrypt encrypted videos
    Decrypt(JobArgs),
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Input video; repeat for several files
    #[arg(long = "input", required = true)]
    inputs: Vec<String>,

    /// Output directory; the engine picks one when omitted
    #[arg(long)]
    output_dir: Option<String>,

    /// Password for the key
    #[arg(long, env = "CIPHERFRAME_PASSWORD", hide_env_values = true)]
    password: String,

    /// Key output directory (encrypt) or key file (decrypt)
    #[arg(long)]
    key: Option<String>,

    /// Cipher algorithm
    #[arg(long, default_value = "FY-Logistic")]
    algorithm: Algorithm,

    /// Skip the quality evaluation after a successful job
    #[arg(long)]
    no_evaluate: bool,
}

/// Path probe backed by the local filesystem.
struct FsPathProbe;

#[async_trait]
impl PathProbe for FsPathProbe {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let (kind, args) = match cli.command {
        Command::Encrypt(args) => (JobKind::Encrypt, args),
        Command::Decrypt(args) => (JobKind::Decrypt, args),
    };

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if args.no_evaluate {
        config.evaluate = false;
    }
    init_tracing(&config.log_directive)?;
    let transport = HttpEngineTransport::new(config.engine_url.as_str())?;
    info!(version = app_version(), engine = %transport.base_url(), "cipherframe starting");

    let mut wizard = Wizard::new(kind, Arc::new(FsPathProbe), Arc::new(NoDialogs));
    wizard.set_algorithm(args.algorithm);
    wizard.update(FieldId::InputPaths, args.inputs.join("\n")).await;
    wizard
        .update(FieldId::OutputDir, args.output_dir.unwrap_or_default())
        .await;
    wizard.update(FieldId::Password, args.password).await;
    wizard.update(FieldId::KeyPath, args.key.unwrap_or_default()).await;

    let mut session = Session::new(
        config,
        wizard,
        Arc::new(transport),
        Arc::new(FsDatasetSource),
    );

    let progress = spawn_progress_log(session.orchestrator().clone());
    let halt_on_ctrl_c = spawn_halt_on_ctrl_c(session.orchestrator().clone());
    let report = submit_all_pages(&mut session).await;
    progress.abort();
    halt_on_ctrl_c.abort();

    match report {
        Ok(report) => {
            print_report(&report);
            Ok(if report.processing.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(AppError::Wizard(WizardError::PageInvalid { fields, .. })) => {
            for field in fields {
                let state = session.wizard().field(field);
                eprintln!("{field}: {}", state.message);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(error) => Err(error.into()),
    }
}

async fn submit_all_pages(session: &mut Session) -> Result<SessionReport, AppError> {
    loop {
        if let Some(report) = session.submit_page().await? {
            return Ok(report);
        }
    }
}

fn spawn_progress_log(orchestrator: JobOrchestrator) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut status = orchestrator.subscribe();
        while status.changed().await.is_ok() {
            let snapshot = status.borrow_and_update().clone();
            if !snapshot.message.is_empty() {
                info!(
                    job_id = snapshot.job_id,
                    phase = ?snapshot.phase,
                    "{}",
                    redact_sensitive(&snapshot.message)
                );
            }
        }
    })
}

fn spawn_halt_on_ctrl_c(orchestrator: JobOrchestrator) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("ctrl-c handler unavailable");
                return;
            }
            match orchestrator.halt() {
                Ok(acknowledgement) => {
                    if let Some(reply) = acknowledgement.await {
                        info!(reply = %redact_sensitive(&reply), "engine acknowledged halt");
                    }
                }
                Err(error) => warn!(%error, "nothing to halt"),
            }
        }
    })
}

fn print_report(report: &SessionReport) {
    println!("{}", describe(&report.processing));
    if let Some(evaluation) = &report.evaluation {
        println!("evaluation: {}", describe(evaluation));
    }
    if let Some(error) = &report.metrics_error {
        println!("metrics unavailable: {error}");
    }
    for file in &report.files {
        print_file(file);
    }
}

fn describe(outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Success(result) => format!(
            "{}: {} file(s) written to {}",
            outcome.description(),
            result.output_paths.len(),
            result.output_dir.as_deref().unwrap_or("-")
        ),
        _ => outcome.description(),
    }
}

fn print_file(file: &FileReport) {
    let name = file.file_name.as_deref().unwrap_or("-");
    println!("\n{name} {}", file.resolution_label);
    for report in &file.reports {
        let definition = report.metric.definition();
        let verdict = if report.is_good { "good" } else { "poor" };
        let score = report
            .score
            .map(|score| format!("{:.1}/100", score.primary()))
            .unwrap_or_else(|| match report.baseline {
                Some(baseline) => format!("baseline {baseline:.4}"),
                None => "no baseline".to_string(),
            });
        println!(
            "  {:<24} {:>12} {:>14}  {verdict:<5} {}",
            definition.label,
            format_raw(&report.raw),
            score,
            report.ideal_description
        );
    }
}

fn format_raw(value: &MetricValue) -> String {
    match value {
        MetricValue::Scalar(value) => format!("{value:.4}"),
        MetricValue::Channels {
            combined,
            red,
            green,
            blue,
        } => format!("{combined:.3} ({red:.2}/{green:.2}/{blue:.2})"),
    }
}
