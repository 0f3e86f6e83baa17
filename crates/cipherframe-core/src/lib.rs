#![warn(missing_docs)]
//! # cipherframe-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `cipherframe` workspace.
//!
//! ## Responsibilities
//! - Represent job requests for encryption/decryption and follow-up evaluation.
//! - Decode progress events pushed by the processing engine.
//! - Build terminal [`JobResult`] values from the engine's final event.
//! - Encode versioned request bodies and derive log-safe request fingerprints.
//!
//! ## Data flow
//! The wizard assembles a [`JobRequest`] -> the orchestrator wraps it in a
//! [`JobSubmission`] and sends [`JobSubmission::to_body`] -> engine events are
//! decoded with [`decode_event`] -> the terminal event becomes a [`JobResult`]
//! -> [`EvaluationRequest::from_result`] feeds the evaluation stage.
//!
//! ## Ownership and lifetimes
//! Requests and results own their path strings so they can move freely between
//! the wizard, the orchestrator tasks, and the metrics engine.
//!
//! ## Error model
//! Codec failures and contract violations (empty input set, unknown algorithm,
//! evaluation of a non-processing result) return [`CoreError`].
//!
//! ## Security and privacy notes
//! [`JobRequest`] never prints its password through `Debug`, and
//! [`JobSubmission::fingerprint`] excludes the password entirely.
//!
//! ## Example
//! ```rust
//! use cipherframe_core::{Algorithm, JobKind, JobRequest};
//!
//! let request = JobRequest::new(JobKind::Encrypt, Algorithm::FyLogistic, vec!["a.mp4".into()])
//!     .unwrap()
//!     .with_password("Str0ng!Pwd");
//! assert!(!format!("{request:?}").contains("Str0ng!Pwd"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Direction of a cryptographic job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Encrypt plain video files.
    Encrypt,
    /// Decrypt previously encrypted video files.
    Decrypt,
}

impl JobKind {
    /// Returns the engine path segment for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Encrypt => "encrypt",
            JobKind::Decrypt => "decrypt",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chaotic-map algorithm selected for the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Fisher-Yates shuffle driven by a logistic map.
    #[default]
    #[serde(rename = "FY-Logistic")]
    FyLogistic,
    /// Three-dimensional cosine map.
    #[serde(rename = "3D-Cosine")]
    Cosine3d,
}

impl Algorithm {
    /// Returns the engine-facing algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::FyLogistic => "FY-Logistic",
            Algorithm::Cosine3d => "3D-Cosine",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "FY-Logistic" => Ok(Algorithm::FyLogistic),
            "3D-Cosine" => Ok(Algorithm::Cosine3d),
            other => Err(CoreError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Engine stage a job runs in; selects the init and progress endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    /// Cryptographic transformation of the input videos.
    Processing,
    /// Quality evaluation of a finished processing run.
    Evaluating,
}

impl JobStage {
    /// Returns the engine path segment for this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Processing => "processing",
            JobStage::Evaluating => "evaluating",
        }
    }
}

/// Validated request handed from the wizard to the orchestrator.
///
/// There is no mutating API after construction; builder methods consume
/// `self`, so a submitted request cannot change underneath a running job.
#[derive(Clone, PartialEq, Eq)]
pub struct JobRequest {
    kind: JobKind,
    algorithm: Algorithm,
    input_paths: Vec<String>,
    output_dir: Option<String>,
    password: Option<String>,
    key_path: Option<String>,
}

impl JobRequest {
    /// Creates a request for the given input videos.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyInputSet`] when no non-blank input path is given.
    pub fn new(
        kind: JobKind,
        algorithm: Algorithm,
        input_paths: Vec<String>,
    ) -> Result<Self, CoreError> {
        let input_paths: Vec<String> = input_paths
            .into_iter()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect();
        if input_paths.is_empty() {
            return Err(CoreError::EmptyInputSet);
        }

        Ok(Self {
            kind,
            algorithm,
            input_paths,
            output_dir: None,
            password: None,
            key_path: None,
        })
    }

    /// Sets the output directory; blank values are treated as absent.
    pub fn with_output_dir(mut self, output_dir: impl Into<String>) -> Self {
        self.output_dir = non_blank(output_dir.into());
        self
    }

    /// Sets the password; blank values are treated as absent.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = if password.is_empty() { None } else { Some(password) };
        self
    }

    /// Sets the key path (key output directory for encryption, key file for
    /// decryption); blank values are treated as absent.
    pub fn with_key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = non_blank(key_path.into());
        self
    }

    /// Job direction.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Selected algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Input video paths.
    pub fn input_paths(&self) -> &[String] {
        &self.input_paths
    }

    /// Optional output directory.
    pub fn output_dir(&self) -> Option<&str> {
        self.output_dir.as_deref()
    }

    /// Optional password.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Optional key path.
    pub fn key_path(&self) -> Option<&str> {
        self.key_path.as_deref()
    }
}

impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRequest")
            .field("kind", &self.kind)
            .field("algorithm", &self.algorithm)
            .field("input_paths", &self.input_paths)
            .field("output_dir", &self.output_dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_path", &self.key_path)
            .finish()
    }
}

/// Request for quality evaluation of a finished processing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Direction of the evaluated run.
    #[serde(rename = "process")]
    pub kind: JobKind,
    /// Algorithm used by the evaluated run.
    pub algorithm: Algorithm,
    /// Original input videos.
    #[serde(rename = "input_filepaths")]
    pub input_paths: Vec<String>,
    /// Videos produced by the evaluated run.
    #[serde(rename = "output_filepaths")]
    pub output_paths: Vec<String>,
}

impl EvaluationRequest {
    /// Builds an evaluation request from a processing result.
    ///
    /// The algorithm reported by the engine wins over `fallback` when it parses.
    ///
    /// # Errors
    /// Returns [`CoreError::NotAProcessingResult`] for evaluation results and
    /// [`CoreError::MissingOutputs`] when the run produced no output files.
    pub fn from_result(result: &JobResult, fallback: Algorithm) -> Result<Self, CoreError> {
        if result.stage != JobStage::Processing {
            return Err(CoreError::NotAProcessingResult);
        }
        if result.output_paths.is_empty() {
            return Err(CoreError::MissingOutputs);
        }

        let algorithm = result
            .algorithm
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(fallback);

        Ok(Self {
            kind: result.kind,
            algorithm,
            input_paths: result.input_paths.clone(),
            output_paths: result.output_paths.clone(),
        })
    }
}

/// Job handed to the orchestrator: either a processing run or an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSubmission {
    /// Encrypt or decrypt input videos.
    Process(JobRequest),
    /// Evaluate the outputs of a previous processing run.
    Evaluate(EvaluationRequest),
}

#[derive(Serialize)]
struct InitBody<'a> {
    process: JobKind,
    algorithm: Algorithm,
    input_filepaths: &'a [String],
    output_dirpath: Option<&'a str>,
    password: Option<&'a str>,
    key_filepath: Option<&'a str>,
}

impl JobSubmission {
    /// Direction of the job.
    pub fn kind(&self) -> JobKind {
        match self {
            JobSubmission::Process(request) => request.kind(),
            JobSubmission::Evaluate(request) => request.kind,
        }
    }

    /// Algorithm of the job.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            JobSubmission::Process(request) => request.algorithm(),
            JobSubmission::Evaluate(request) => request.algorithm,
        }
    }

    /// Engine stage the job runs in.
    pub fn stage(&self) -> JobStage {
        match self {
            JobSubmission::Process(_) => JobStage::Processing,
            JobSubmission::Evaluate(_) => JobStage::Evaluating,
        }
    }

    /// Encodes the init request body sent to the engine.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_body(&self) -> Result<serde_json::Value, CoreError> {
        let value = match self {
            JobSubmission::Process(request) => serde_json::to_value(InitBody {
                process: request.kind,
                algorithm: request.algorithm,
                input_filepaths: &request.input_paths,
                output_dirpath: request.output_dir(),
                password: request.password(),
                key_filepath: request.key_path(),
            }),
            JobSubmission::Evaluate(request) => serde_json::to_value(request),
        };
        value.map_err(CoreError::Codec)
    }

    /// Returns a short, log-safe identifier for this submission.
    ///
    /// The digest covers kind, stage, algorithm and paths. The password is
    /// never part of the digest.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind().as_str());
        hasher.update([0u8]);
        hasher.update(self.stage().as_str());
        hasher.update([0u8]);
        hasher.update(self.algorithm().as_str());
        match self {
            JobSubmission::Process(request) => {
                for path in request.input_paths() {
                    hasher.update([0u8]);
                    hasher.update(path);
                }
                hasher.update([1u8]);
                hasher.update(request.output_dir().unwrap_or_default());
                hasher.update([1u8]);
                hasher.update(request.key_path().unwrap_or_default());
            }
            JobSubmission::Evaluate(request) => {
                for path in request.input_paths.iter().chain(&request.output_paths) {
                    hasher.update([0u8]);
                    hasher.update(path);
                }
            }
        }
        let digest = hex::encode(hasher.finalize());
        digest[..16].to_string()
    }
}

impl From<JobRequest> for JobSubmission {
    fn from(request: JobRequest) -> Self {
        JobSubmission::Process(request)
    }
}

impl From<EvaluationRequest> for JobSubmission {
    fn from(request: EvaluationRequest) -> Self {
        JobSubmission::Evaluate(request)
    }
}

/// Status carried by one progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Job is still running; the message is a progress line.
    Running,
    /// Job finished successfully; the event carries terminal artifacts.
    Success,
    /// Job failed on the engine side.
    Failure,
}

impl EventStatus {
    /// Returns `true` for `success` and `failure`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Success | EventStatus::Failure)
    }
}

/// Terminal artifacts attached to a `success` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobArtifacts {
    /// Input file names.
    #[serde(default)]
    pub input_files: Vec<String>,
    /// Input file paths.
    #[serde(default)]
    pub input_filepaths: Vec<String>,
    /// Algorithm name reported by the engine.
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Output directory used by the engine.
    #[serde(default)]
    pub output_dirpath: Option<String>,
    /// Produced files (videos for processing, CSV datasets for evaluation).
    #[serde(default)]
    pub output_filepaths: Vec<String>,
    /// Per-file timing logs.
    #[serde(default)]
    pub time_filepaths: Vec<String>,
    /// Video resolutions as `[width, height]` pairs.
    #[serde(default)]
    pub resolutions: Vec<(u32, u32)>,
    /// Baseline timing samples per file, used for timing thresholds.
    #[serde(default)]
    pub baseline_speed_metrics: Vec<Vec<f64>>,
}

/// One unit of the engine's progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Last line printed by the engine.
    #[serde(rename = "stdout", default)]
    pub message: String,
    /// Event status.
    pub status: EventStatus,
    /// Explicit failure reason code, when the engine supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Terminal artifacts; empty for running events.
    #[serde(flatten)]
    pub artifacts: JobArtifacts,
}

impl JobEvent {
    /// Creates a running event with a progress message.
    pub fn running(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: EventStatus::Running,
            reason: None,
            artifacts: JobArtifacts::default(),
        }
    }

    /// Creates a failure event with the given reason code.
    pub fn failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            message: reason.clone(),
            status: EventStatus::Failure,
            reason: Some(reason),
            artifacts: JobArtifacts::default(),
        }
    }

    /// Creates a success event carrying terminal artifacts.
    pub fn success(message: impl Into<String>, artifacts: JobArtifacts) -> Self {
        Self {
            message: message.into(),
            status: EventStatus::Success,
            reason: None,
            artifacts,
        }
    }

    /// Failure reason code: explicit `reason` when present, otherwise the
    /// trimmed message.
    pub fn reason_code(&self) -> &str {
        self.reason.as_deref().unwrap_or(&self.message).trim()
    }
}

/// Decodes one progress event from its JSON text.
///
/// # Errors
/// Returns [`CoreError::Codec`] for malformed JSON or a missing status.
pub fn decode_event(raw: &str) -> Result<JobEvent, CoreError> {
    serde_json::from_str(raw).map_err(CoreError::Codec)
}

/// Terminal payload of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Direction of the finished job.
    pub kind: JobKind,
    /// Stage the job ran in.
    pub stage: JobStage,
    /// Input file names.
    pub input_files: Vec<String>,
    /// Input file paths.
    pub input_paths: Vec<String>,
    /// Algorithm name reported by the engine.
    pub algorithm: Option<String>,
    /// Output directory used by the engine.
    pub output_dir: Option<String>,
    /// Files written by the engine.
    pub output_paths: Vec<String>,
    /// Per-file timing logs.
    pub time_paths: Vec<String>,
    /// Video resolutions as `(width, height)`.
    pub resolutions: Vec<(u32, u32)>,
    /// Baseline timing samples per file.
    pub baseline_speeds: Vec<Vec<f64>>,
    /// Per-frame metric datasets (evaluation stage only).
    pub dataset_paths: Vec<String>,
}

impl JobResult {
    /// Builds a result from the terminal `success` event of a job.
    pub fn from_event(kind: JobKind, stage: JobStage, event: &JobEvent) -> Self {
        let artifacts = event.artifacts.clone();
        let dataset_paths = match stage {
            JobStage::Evaluating => artifacts.output_filepaths.clone(),
            JobStage::Processing => Vec::new(),
        };

        Self {
            kind,
            stage,
            input_files: artifacts.input_files,
            input_paths: artifacts.input_filepaths,
            algorithm: artifacts.algorithm,
            output_dir: artifacts.output_dirpath,
            output_paths: artifacts.output_filepaths,
            time_paths: artifacts.time_filepaths,
            resolutions: artifacts.resolutions,
            baseline_speeds: artifacts.baseline_speed_metrics,
            dataset_paths,
        }
    }
}

/// Errors produced by core model validation and codecs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A job needs at least one input path.
    #[error("job request has no input paths")]
    EmptyInputSet,
    /// Algorithm name is not one of the supported algorithms.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    /// Only processing results can be evaluated.
    #[error("evaluation requires a processing result")]
    NotAProcessingResult,
    /// Processing run produced no output files to evaluate.
    #[error("processing result has no output files")]
    MissingOutputs,
    /// JSON encoding/decoding error.
    #[error("event codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
