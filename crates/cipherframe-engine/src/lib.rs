#![warn(missing_docs)]
//! # cipherframe-engine
//!
//! ## Purpose
//! Coordinates the lifecycle of one in-flight job on the remote processing
//! engine: submission, live progress, cancellation, and terminal outcome.
//!
//! ## Responsibilities
//! - Model legal job transitions in [`JobStateMachine`], with absorbing
//!   terminal states and at-most-one active job.
//! - Run the submission leg and the progress-stream leg concurrently through
//!   an injectable [`EngineTransport`].
//! - Close the progress stream through an idempotent [`ProgressChannel`] from
//!   either the terminal-event path or the halt path.
//! - Map failures to a fixed taxonomy with user-facing descriptions.
//!
//! ## Data flow
//! [`JobSubmission`] -> [`JobOrchestrator::run`] -> `submit` + `open_progress`
//! legs -> decoded [`JobEvent`]s drive [`JobStateMachine`] -> [`JobSnapshot`]
//! published on a watch channel -> terminal [`JobOutcome`].
//!
//! ## Ownership and lifetimes
//! The orchestrator is a cheap `Clone` handle over shared state, so the UI can
//! keep one copy for [`JobOrchestrator::halt`] while another task awaits
//! [`JobOrchestrator::run`]. Locks are never held across `.await`.
//!
//! ## Error model
//! Caller misuse (submitting while active, halting while idle) returns
//! [`OrchestratorError`]. Job failures are not errors: they resolve to
//! [`JobOutcome::Failure`] carrying a [`JobFailure`].
//!
//! ## Security and privacy notes
//! Logs carry the job id and request fingerprint only. Engine output lines
//! and request bodies are never logged here.
//!
//! ## Example
//! ```rust
//! use cipherframe_engine::{JobPhase, JobStateMachine};
//!
//! let machine = JobStateMachine::new();
//! assert_eq!(machine.phase(), JobPhase::Idle);
//! ```

mod http;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cipherframe_core::{
    CoreError, JobEvent, JobKind, JobResult, JobStage, JobSubmission, decode_event,
};
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use http::HttpEngineTransport;

/// Engine reason code for a password that does not match the key.
pub const WRONG_PASSWORD_REASON: &str = "WRONG PASSWORD";
/// Description for a failed submission call.
pub const TRANSPORT_ERROR_DESCRIPTION: &str =
    "Could not reach the processing engine (connection lost).";
/// Description for a progress stream that dropped without a terminal event.
pub const STREAM_ERROR_DESCRIPTION: &str = "Connection to the processing engine was lost.";
/// Description for an engine-reported password mismatch.
pub const WRONG_PASSWORD_DESCRIPTION: &str = "Incorrect password for the provided key.";
/// Description for every other engine-reported failure.
pub const UNKNOWN_ERROR_DESCRIPTION: &str = "An unknown error occurred while processing.";
/// Description for a user halt when the engine sent no text.
pub const HALTED_DESCRIPTION: &str = "Processing halted by user.";

/// Path of the processing init endpoint.
pub const INIT_PROCESSING_PATH: &str = "init_cryptographic_handler";
/// Path of the evaluation init endpoint.
pub const INIT_EVALUATION_PATH: &str = "init_analysis_handler";
/// Path of the halt endpoint.
pub const HALT_PATH: &str = "halt_processing";

/// Returns the init endpoint path for a stage.
pub fn init_path(stage: JobStage) -> &'static str {
    match stage {
        JobStage::Processing => INIT_PROCESSING_PATH,
        JobStage::Evaluating => INIT_EVALUATION_PATH,
    }
}

/// Returns the progress stream path, e.g. `decrypt/processing`.
pub fn progress_path(kind: JobKind, stage: JobStage) -> String {
    format!("{}/{}", kind.as_str(), stage.as_str())
}

/// Lifecycle phase of the orchestrated job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// No job has been submitted.
    Idle,
    /// Job handed off; progress stream not yet established.
    Submitting,
    /// Progress stream established.
    Streaming,
    /// Engine reported success.
    Success,
    /// Submission, stream, or engine failed.
    Failure,
    /// User halted the job.
    Halted,
}

impl JobPhase {
    /// Returns `true` for `Submitting` and `Streaming`.
    pub fn is_active(&self) -> bool {
        matches!(self, JobPhase::Submitting | JobPhase::Streaming)
    }

    /// Returns `true` for `Success`, `Failure` and `Halted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Success | JobPhase::Failure | JobPhase::Halted)
    }
}

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The submission call failed.
    Transport {
        /// Transport error text, for logs.
        detail: String,
    },
    /// The progress stream dropped without a terminal event.
    Stream {
        /// Transport error text, for logs.
        detail: String,
    },
    /// The engine reported `status = failure`.
    Remote {
        /// Engine reason code.
        reason: String,
    },
}

impl JobFailure {
    /// User-facing description.
    ///
    /// Only the `WRONG PASSWORD` reason has a specific message; every other
    /// remote reason collapses to the generic unknown-error message.
    pub fn description(&self) -> &'static str {
        match self {
            JobFailure::Transport { .. } => TRANSPORT_ERROR_DESCRIPTION,
            JobFailure::Stream { .. } => STREAM_ERROR_DESCRIPTION,
            JobFailure::Remote { reason } if is_wrong_password(reason) => {
                WRONG_PASSWORD_DESCRIPTION
            }
            JobFailure::Remote { .. } => UNKNOWN_ERROR_DESCRIPTION,
        }
    }

    /// Short taxonomy label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            JobFailure::Transport { .. } => "transport-error",
            JobFailure::Stream { .. } => "stream-error",
            JobFailure::Remote { .. } => "remote-failure",
        }
    }
}

fn is_wrong_password(reason: &str) -> bool {
    reason.trim().eq_ignore_ascii_case(WRONG_PASSWORD_REASON)
}

/// Action offered to the user on every terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    /// Resubmit the same request.
    TryAgain,
    /// Discard the session.
    ReturnHome,
}

/// Terminal job state in one shape for the result display.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Engine finished the job.
    Success(JobResult),
    /// Job failed.
    Failure(JobFailure),
    /// User halted the job.
    Halted {
        /// Engine halt reply, or the default halt description.
        description: String,
    },
}

impl JobOutcome {
    /// Phase corresponding to this outcome.
    pub fn phase(&self) -> JobPhase {
        match self {
            JobOutcome::Success(_) => JobPhase::Success,
            JobOutcome::Failure(_) => JobPhase::Failure,
            JobOutcome::Halted { .. } => JobPhase::Halted,
        }
    }

    /// User-facing description.
    pub fn description(&self) -> String {
        match self {
            JobOutcome::Success(_) => "Processing completed.".to_string(),
            JobOutcome::Failure(failure) => failure.description().to_string(),
            JobOutcome::Halted { description } => description.clone(),
        }
    }

    /// Returns `true` for a successful job.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    /// Actions offered to the user. Every terminal state offers both.
    pub fn actions(&self) -> [TerminalAction; 2] {
        [TerminalAction::TryAgain, TerminalAction::ReturnHome]
    }
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    /// Generation of the current job; `0` before the first submission.
    pub job_id: u64,
    /// Current phase.
    pub phase: JobPhase,
    /// Last progress message from the engine.
    pub message: String,
    /// Terminal outcome, once reached.
    pub outcome: Option<JobOutcome>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveJob {
    kind: JobKind,
    stage: JobStage,
}

/// Effect of feeding one event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    /// Event belonged to a stale or finished job.
    Ignored,
    /// Running event; only the message changed.
    Progress,
    /// Terminal event; the job finished.
    Terminal,
}

/// Job lifecycle state machine with explicit legal transitions.
///
/// Every transition after [`JobStateMachine::begin`] is keyed by the job id it
/// returned, so late callbacks from an earlier job are ignored.
#[derive(Debug, Clone)]
pub struct JobStateMachine {
    job_id: u64,
    phase: JobPhase,
    message: String,
    outcome: Option<JobOutcome>,
    active: Option<ActiveJob>,
}

impl JobStateMachine {
    /// Creates a machine in `Idle`.
    pub fn new() -> Self {
        Self {
            job_id: 0,
            phase: JobPhase::Idle,
            message: String::new(),
            outcome: None,
            active: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Current job generation.
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Last progress message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Terminal outcome, once reached.
    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    /// Snapshot for publication.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id,
            phase: self.phase,
            message: self.message.clone(),
            outcome: self.outcome.clone(),
        }
    }

    /// Starts a new job: `Idle | terminal -> Submitting`.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::JobAlreadyActive`] while another job is
    /// `Submitting` or `Streaming`; the active job is left untouched.
    pub fn begin(&mut self, submission: &JobSubmission) -> Result<u64, OrchestratorError> {
        if self.phase.is_active() {
            return Err(OrchestratorError::JobAlreadyActive { phase: self.phase });
        }

        self.job_id += 1;
        self.phase = JobPhase::Submitting;
        self.message.clear();
        self.outcome = None;
        self.active = Some(ActiveJob {
            kind: submission.kind(),
            stage: submission.stage(),
        });
        Ok(self.job_id)
    }

    /// `Submitting -> Streaming` once the progress stream is established.
    pub fn on_stream_opened(&mut self, job_id: u64) -> bool {
        if !self.is_current(job_id) || self.phase != JobPhase::Submitting {
            return false;
        }
        self.phase = JobPhase::Streaming;
        true
    }

    /// Applies one progress event.
    ///
    /// Running events update only the message. Terminal events finish the job.
    pub fn on_event(&mut self, job_id: u64, event: &JobEvent) -> EventEffect {
        let Some(active) = self.active_job(job_id) else {
            return EventEffect::Ignored;
        };

        self.phase = JobPhase::Streaming;
        self.message = event.message.clone();

        match event.status {
            cipherframe_core::EventStatus::Running => EventEffect::Progress,
            cipherframe_core::EventStatus::Success => {
                let result = JobResult::from_event(active.kind, active.stage, event);
                self.finish(JobOutcome::Success(result));
                EventEffect::Terminal
            }
            cipherframe_core::EventStatus::Failure => {
                self.finish(JobOutcome::Failure(JobFailure::Remote {
                    reason: event.reason_code().to_string(),
                }));
                EventEffect::Terminal
            }
        }
    }

    /// Submission call failed: active job -> `Failure(Transport)`.
    pub fn on_submit_failed(&mut self, job_id: u64, detail: impl Into<String>) -> bool {
        if self.active_job(job_id).is_none() {
            return false;
        }
        self.finish(JobOutcome::Failure(JobFailure::Transport {
            detail: detail.into(),
        }));
        true
    }

    /// Stream dropped without a terminal event: active job -> `Failure(Stream)`.
    pub fn on_stream_failed(&mut self, job_id: u64, detail: impl Into<String>) -> bool {
        if self.active_job(job_id).is_none() {
            return false;
        }
        self.finish(JobOutcome::Failure(JobFailure::Stream {
            detail: detail.into(),
        }));
        true
    }

    /// User halt: active job -> `Halted`, without waiting for the engine.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::NoActiveJob`] when nothing is in flight.
    pub fn halt(&mut self) -> Result<u64, OrchestratorError> {
        if !self.phase.is_active() {
            return Err(OrchestratorError::NoActiveJob);
        }
        self.finish(JobOutcome::Halted {
            description: HALTED_DESCRIPTION.to_string(),
        });
        Ok(self.job_id)
    }

    /// Records the engine's textual halt reply as the halt description.
    ///
    /// Ignored unless the same job is still `Halted`.
    pub fn on_halt_reply(&mut self, job_id: u64, reply: impl Into<String>) -> bool {
        if job_id != self.job_id || self.phase != JobPhase::Halted {
            return false;
        }
        let reply = reply.into();
        if reply.trim().is_empty() {
            return false;
        }
        self.outcome = Some(JobOutcome::Halted {
            description: reply.trim().to_string(),
        });
        true
    }

    /// Returns to `Idle`, discarding the finished job.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::JobAlreadyActive`] while a job is in flight.
    pub fn reset(&mut self) -> Result<(), OrchestratorError> {
        if self.phase.is_active() {
            return Err(OrchestratorError::JobAlreadyActive { phase: self.phase });
        }
        self.phase = JobPhase::Idle;
        self.message.clear();
        self.outcome = None;
        Ok(())
    }

    fn is_current(&self, job_id: u64) -> bool {
        job_id == self.job_id && self.active.is_some()
    }

    fn active_job(&self, job_id: u64) -> Option<ActiveJob> {
        if self.is_current(job_id) && self.phase.is_active() {
            self.active
        } else {
            None
        }
    }

    fn finish(&mut self, outcome: JobOutcome) {
        self.phase = outcome.phase();
        self.outcome = Some(outcome);
        self.active = None;
    }
}

impl Default for JobStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Close handle for one progress stream.
///
/// Clones share the same flag. [`ProgressChannel::close`] is idempotent and
/// safe to call from the terminal-event path and the halt path.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    closed: Arc<watch::Sender<bool>>,
}

impl ProgressChannel {
    /// Creates an open channel.
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            closed: Arc::new(closed),
        }
    }

    /// Closes the channel. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    /// Returns `true` once closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the channel is closed.
    pub async fn closed(&self) {
        let mut receiver = self.closed.subscribe();
        // The sender lives in `self`, so this only returns once closed.
        let _ = receiver.wait_for(|closed| *closed).await;
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw progress frames (event JSON text) from the engine.
pub type ProgressStream = BoxStream<'static, Result<String, TransportError>>;

/// Abstract transport to the remote processing engine.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    /// Sends the job-initiation request for `stage`.
    async fn submit(&self, stage: JobStage, body: &serde_json::Value) -> Result<(), TransportError>;

    /// Opens the server-push progress stream for `kind` and `stage`.
    async fn open_progress(
        &self,
        kind: JobKind,
        stage: JobStage,
    ) -> Result<ProgressStream, TransportError>;

    /// Asks the engine to halt; returns its textual reply, if any.
    async fn halt(&self) -> Result<Option<String>, TransportError>;
}

/// Orchestrator tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Fails the job when no progress frame arrives for this long.
    /// `None` waits as long as the transport allows.
    pub stream_idle_timeout: Option<Duration>,
}

/// Pending engine acknowledgement of a halt.
///
/// The local transition to `Halted` has already happened when this exists.
/// Await it to record the engine reply, or drop it to skip the remote call.
pub type HaltAcknowledgement = BoxFuture<'static, Option<String>>;

struct Shared {
    transport: Arc<dyn EngineTransport>,
    config: OrchestratorConfig,
    machine: Mutex<JobStateMachine>,
    channel: Mutex<Option<ProgressChannel>>,
    status: watch::Sender<JobSnapshot>,
}

impl Shared {
    fn machine(&self) -> MutexGuard<'_, JobStateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(&self, apply: impl FnOnce(&mut JobStateMachine) -> T) -> T {
        let mut machine = self.machine();
        let value = apply(&mut machine);
        self.status.send_replace(machine.snapshot());
        value
    }

    fn install_channel(&self, channel: ProgressChannel) {
        *self.channel.lock().unwrap_or_else(PoisonError::into_inner) = Some(channel);
    }

    #[cfg(test)]
    fn current_channel(&self) -> Option<ProgressChannel> {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn close_channel(&self) {
        let channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(channel) = channel.as_ref()
            && channel.close()
        {
            debug!("progress channel closed");
        }
    }
}

enum StreamStep {
    Frame(Result<String, TransportError>),
    Ended,
    IdleTimeout(Duration),
}

/// Drives one job at a time against an [`EngineTransport`].
#[derive(Clone)]
pub struct JobOrchestrator {
    shared: Arc<Shared>,
}

impl JobOrchestrator {
    /// Creates an orchestrator in `Idle`.
    pub fn new(transport: Arc<dyn EngineTransport>, config: OrchestratorConfig) -> Self {
        let machine = JobStateMachine::new();
        let (status, _) = watch::channel(machine.snapshot());
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                machine: Mutex::new(machine),
                channel: Mutex::new(None),
                status,
            }),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.machine().snapshot()
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.status.subscribe()
    }

    /// Waits for the most recent terminal outcome.
    ///
    /// Called after a job finished and before the next [`JobOrchestrator::run`]
    /// begins, this resolves immediately with that finished job's outcome.
    /// Resolves to `None` only if the status channel closed first.
    pub async fn wait_for_outcome(&self) -> Option<JobOutcome> {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|snapshot| snapshot.outcome.is_some()).await {
            Ok(snapshot) => snapshot.outcome.clone(),
            Err(_) => self.snapshot().outcome,
        }
    }

    /// Runs one job to its terminal outcome.
    ///
    /// The submission call and the progress stream start back-to-back and run
    /// concurrently; either may finish first.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::JobAlreadyActive`] while another job is in
    /// flight, and [`OrchestratorError::Request`] when the body cannot be
    /// encoded. Job failures resolve to [`JobOutcome::Failure`] instead.
    pub async fn run(
        &self,
        submission: impl Into<JobSubmission>,
    ) -> Result<JobOutcome, OrchestratorError> {
        let submission = submission.into();
        let body = submission.to_body()?;
        let kind = submission.kind();
        let stage = submission.stage();

        // The channel is installed under the machine lock so a concurrent
        // halt always sees the channel of the job it halts.
        let (job_id, channel) = self.shared.update(|machine| {
            let job_id = machine.begin(&submission)?;
            let channel = ProgressChannel::new();
            self.shared.install_channel(channel.clone());
            Ok::<_, OrchestratorError>((job_id, channel))
        })?;

        info!(
            job_id,
            fingerprint = %submission.fingerprint(),
            %kind,
            stage = stage.as_str(),
            "submitting job"
        );

        tokio::join!(
            self.submission_leg(job_id, stage, &body, &channel),
            self.stream_leg(job_id, kind, stage, &channel),
        );

        let outcome = self.shared.update(|machine| {
            machine.on_stream_failed(job_id, "progress legs ended without a terminal state");
            if machine.job_id() == job_id {
                machine.outcome().cloned()
            } else {
                None
            }
        });
        channel.close();

        match outcome {
            Some(outcome) => {
                info!(job_id, phase = ?outcome.phase(), "job finished");
                Ok(outcome)
            }
            None => Err(OrchestratorError::Superseded),
        }
    }

    /// Halts the in-flight job.
    ///
    /// The local state becomes `Halted` and the progress stream closes before
    /// this returns. The returned future sends the cancellation request and
    /// records the engine's reply; the UI need not wait for it.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::NoActiveJob`] when nothing is in flight.
    pub fn halt(&self) -> Result<HaltAcknowledgement, OrchestratorError> {
        let job_id = self.shared.update(JobStateMachine::halt)?;
        self.shared.close_channel();
        info!(job_id, "job halted locally");

        let shared = Arc::clone(&self.shared);
        Ok(async move {
            match shared.transport.halt().await {
                Ok(Some(reply)) => {
                    let recorded = shared.update(|machine| machine.on_halt_reply(job_id, reply.clone()));
                    debug!(job_id, recorded, "engine acknowledged halt");
                    Some(reply)
                }
                Ok(None) => None,
                Err(error) => {
                    warn!(job_id, %error, "halt request failed");
                    None
                }
            }
        }
        .boxed())
    }

    /// Returns to `Idle` after a terminal state ("Return Home").
    ///
    /// # Errors
    /// Returns [`OrchestratorError::JobAlreadyActive`] while a job is in flight.
    pub fn reset(&self) -> Result<(), OrchestratorError> {
        self.shared.update(JobStateMachine::reset)
    }

    async fn submission_leg(
        &self,
        job_id: u64,
        stage: JobStage,
        body: &serde_json::Value,
        channel: &ProgressChannel,
    ) {
        let result = tokio::select! {
            biased;
            _ = channel.closed() => return,
            result = self.shared.transport.submit(stage, body) => result,
        };

        match result {
            Ok(()) => debug!(job_id, "engine accepted submission"),
            Err(error) => {
                if self
                    .shared
                    .update(|machine| machine.on_submit_failed(job_id, error.to_string()))
                {
                    warn!(job_id, %error, failure = "transport-error", "submission failed");
                    channel.close();
                }
            }
        }
    }

    async fn stream_leg(
        &self,
        job_id: u64,
        kind: JobKind,
        stage: JobStage,
        channel: &ProgressChannel,
    ) {
        let opened = tokio::select! {
            biased;
            _ = channel.closed() => return,
            opened = self.shared.transport.open_progress(kind, stage) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => {
                self.fail_stream(job_id, error.to_string(), channel);
                return;
            }
        };

        if self.shared.update(|machine| machine.on_stream_opened(job_id)) {
            info!(job_id, "progress stream open");
        }

        loop {
            let step = tokio::select! {
                biased;
                _ = channel.closed() => break,
                step = self.next_step(&mut stream) => step,
            };

            match step {
                StreamStep::Frame(Ok(raw)) => {
                    let event = match decode_event(&raw) {
                        Ok(event) => event,
                        Err(error) => {
                            warn!(job_id, %error, "skipping malformed progress frame");
                            continue;
                        }
                    };

                    match self.shared.update(|machine| machine.on_event(job_id, &event)) {
                        EventEffect::Terminal => {
                            info!(job_id, status = ?event.status, "terminal event received");
                            channel.close();
                            break;
                        }
                        EventEffect::Progress => {}
                        EventEffect::Ignored => break,
                    }
                }
                StreamStep::Frame(Err(error)) => {
                    self.fail_stream(job_id, error.to_string(), channel);
                    break;
                }
                StreamStep::Ended => {
                    self.fail_stream(job_id, "stream ended without a terminal event", channel);
                    break;
                }
                StreamStep::IdleTimeout(after) => {
                    let detail = format!("no progress for {}s", after.as_secs());
                    self.fail_stream(job_id, detail, channel);
                    break;
                }
            }
        }
    }

    async fn next_step(&self, stream: &mut ProgressStream) -> StreamStep {
        let next = match self.shared.config.stream_idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => return StreamStep::IdleTimeout(limit),
            },
            None => stream.next().await,
        };

        match next {
            Some(frame) => StreamStep::Frame(frame),
            None => StreamStep::Ended,
        }
    }

    fn fail_stream(&self, job_id: u64, detail: impl Into<String>, channel: &ProgressChannel) {
        let detail = detail.into();
        if self
            .shared
            .update(|machine| machine.on_stream_failed(job_id, detail.clone()))
        {
            warn!(job_id, %detail, failure = "stream-error", "progress stream lost");
        }
        channel.close();
    }
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("config", &self.shared.config)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Transport-level failures talking to the engine.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Engine base URL is unusable.
    #[error("invalid engine endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request could not be sent or the connection broke.
    #[error("engine connection failure: {0}")]
    Connection(String),
    /// Engine answered with a non-success HTTP status.
    #[error("engine returned HTTP {0}")]
    Status(u16),
    /// Server-push stream broke mid-flight.
    #[error("progress stream failure: {0}")]
    Stream(String),
}

/// Caller-facing orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A job is already `Submitting` or `Streaming`.
    #[error("a job is already in flight ({phase:?})")]
    JobAlreadyActive {
        /// Phase of the in-flight job.
        phase: JobPhase,
    },
    /// Halt requested while nothing is in flight.
    #[error("no job is in flight")]
    NoActiveJob,
    /// A newer job replaced this one before its outcome was read.
    #[error("job was superseded by a newer submission")]
    Superseded,
    /// Request body could not be encoded.
    #[error("request encoding failed: {0}")]
    Request(#[from] CoreError),
}
