#![warn(missing_docs)]
//! # cipherframe-app
//!
//! ## Purpose
//! Wires the wizard, job orchestrator and metrics engine into one session for
//! the `cipherframe` client.
//!
//! ## Responsibilities
//! - Load runtime configuration from the environment.
//! - Install structured logging and redact secrets from log text.
//! - Run a [`Session`]: wizard request -> processing job -> optional
//!   evaluation job -> metric reports.
//! - Project orchestrator snapshots into flat display status.
//!
//! ## Data flow
//! Env -> [`AppConfig`] -> [`Session`] -> `JobOrchestrator` -> terminal
//! outcome -> [`SessionReport`] -> CLI output.
//!
//! ## Ownership and lifetimes
//! The session owns its wizard and one orchestrator handle; the orchestrator
//! handle is cloned out for the Ctrl-C halt path.
//!
//! ## Error model
//! Subsystem errors are wrapped in [`AppError`]. Job failures are outcomes,
//! not errors, and never abort the process.
//!
//! ## Security and privacy notes
//! - Engine endpoints must be HTTPS unless they point at the local machine.
//! - [`redact_sensitive`] strips credential values before text is logged.
//! - Passwords never appear in request fingerprints or logs.

mod session;

use std::net::IpAddr;
use std::time::Duration;

use cipherframe_engine::{JobSnapshot, OrchestratorConfig, OrchestratorError, TerminalAction};
use cipherframe_metrics::MetricsError;
use cipherframe_wizard::WizardError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

pub use session::{DatasetSource, FsDatasetSource, Session, SessionReport};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("CIPHERFRAME_VERSION");

/// Engine base URL variable.
pub const ENV_ENGINE_URL: &str = "CIPHERFRAME_ENGINE_URL";
/// Progress stream idle timeout variable, in seconds.
pub const ENV_STREAM_IDLE_TIMEOUT: &str = "CIPHERFRAME_STREAM_IDLE_TIMEOUT_SECS";
/// Default log directive variable.
pub const ENV_LOG: &str = "CIPHERFRAME_LOG";
/// Automatic evaluation toggle variable.
pub const ENV_EVALUATE: &str = "CIPHERFRAME_EVALUATE";

/// Engine URL used when none is configured.
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:5000";
/// Log directive used when none is configured.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Engine base URL.
    pub engine_url: Url,
    /// Progress stream idle timeout; `None` disables it.
    pub stream_idle_timeout: Option<Duration>,
    /// Default tracing directive when `RUST_LOG` is unset.
    pub log_directive: String,
    /// Run an evaluation job after every successful processing job.
    pub evaluate: bool,
}

impl AppConfig {
    /// Loads configuration from process environment.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through a variable lookup.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEngineUrl`] for an unparsable URL,
    /// [`ConfigError::InsecureEngineUrl`] for plain HTTP to a remote host, and
    /// [`ConfigError::InvalidTimeout`] for a non-integer timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = non_blank(lookup(ENV_ENGINE_URL)).unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string());
        let engine_url =
            Url::parse(&raw_url).map_err(|_| ConfigError::InvalidEngineUrl(raw_url.clone()))?;
        if !is_allowed_endpoint(&engine_url) {
            return Err(ConfigError::InsecureEngineUrl(raw_url));
        }

        let stream_idle_timeout = match non_blank(lookup(ENV_STREAM_IDLE_TIMEOUT)) {
            None => None,
            Some(raw) => {
                let seconds: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
                (seconds > 0).then(|| Duration::from_secs(seconds))
            }
        };

        let log_directive = non_blank(lookup(ENV_LOG)).unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string());
        let evaluate = toggle_enabled(lookup(ENV_EVALUATE).as_deref());

        Ok(Self {
            engine_url,
            stream_idle_timeout,
            log_directive,
            evaluate,
        })
    }

    /// Orchestrator settings derived from this configuration.
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            stream_idle_timeout: self.stream_idle_timeout,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Kill-switch style toggle.
///
/// Semantics:
/// - Unset => enabled.
/// - `0`, `false`, `off` (case-insensitive) => disabled.
/// - Any other value => enabled.
fn toggle_enabled(value: Option<&str>) -> bool {
    match value {
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        None => true,
    }
}

/// Returns `true` for HTTPS endpoints and for any endpoint on a loopback host.
pub fn is_allowed_endpoint(url: &Url) -> bool {
    match url.scheme() {
        "https" => true,
        "http" => match url.host_str() {
            Some("localhost") => true,
            Some(host) => host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .is_ok_and(|ip| ip.is_loopback()),
            None => false,
        },
        _ => false,
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` applies.
///
/// # Errors
/// Returns [`AppError::Logging`] when the directive is invalid or a subscriber
/// is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|error| AppError::Logging(error.to_string()))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))
}

const SENSITIVE_KEYS: [&str; 4] = ["password", "authorization", "token", "key"];

/// Redacts credential values in log-safe output.
///
/// A key counts when it starts a word and is followed by `=` or `:`
/// (optionally quoted). Everything after the first such key is dropped.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let first = SENSITIVE_KEYS
        .iter()
        .filter_map(|key| find_assignment(&lower, key).map(|position| (position, *key)))
        .min_by_key(|(position, _)| *position);

    match first {
        Some((position, key)) => format!("{}{key}=<redacted>", &input[..position]),
        None => input.to_string(),
    }
}

fn find_assignment(lower: &str, key: &str) -> Option<usize> {
    lower.match_indices(key).map(|(position, _)| position).find(|&position| {
        let starts_word = lower[..position]
            .chars()
            .next_back()
            .is_none_or(|ch| !ch.is_ascii_alphanumeric() && ch != '_');
        let rest = lower[position + key.len()..].trim_start_matches('"').trim_start();
        starts_word && (rest.starts_with('=') || rest.starts_with(':'))
    })
}

/// Flat status snapshot for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Phase name.
    pub phase: String,
    /// Last engine line, redacted.
    pub message: String,
    /// Terminal description, once finished.
    pub description: Option<String>,
    /// Whether the halt control is enabled.
    pub can_halt: bool,
    /// Terminal actions offered to the user.
    pub actions: Vec<TerminalAction>,
}

/// Projects an orchestrator snapshot into flat display status.
pub fn project_status(snapshot: &JobSnapshot) -> RuntimeStatus {
    RuntimeStatus {
        phase: format!("{:?}", snapshot.phase),
        message: redact_sensitive(&snapshot.message),
        description: snapshot.outcome.as_ref().map(|outcome| outcome.description()),
        can_halt: snapshot.phase.is_active(),
        actions: snapshot
            .outcome
            .as_ref()
            .map(|outcome| outcome.actions().to_vec())
            .unwrap_or_default(),
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Engine URL does not parse.
    #[error("invalid engine url: {0}")]
    InvalidEngineUrl(String),
    /// Engine URL is plain HTTP to a non-loopback host.
    #[error("engine url must use https for non-local hosts: {0}")]
    InsecureEngineUrl(String),
    /// Timeout is not a whole number of seconds.
    #[error("invalid stream idle timeout: {0}")]
    InvalidTimeout(String),
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Logging could not be installed.
    #[error("logging error: {0}")]
    Logging(String),
    /// Wizard rejected the input.
    #[error("wizard error: {0}")]
    Wizard(#[from] WizardError),
    /// Orchestrator rejected the command.
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
    /// Engine transport could not be created.
    #[error("transport error: {0}")]
    Transport(#[from] cipherframe_engine::TransportError),
    /// Metric dataset could not be analyzed.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
    /// Try again requested before any job ran.
    #[error("no previous request to retry")]
    NothingToRetry,
}

#[cfg(test)]
mod tests {
    //! Unit tests for toggles and endpoint rules.

    use super::*;

    #[test]
    fn toggle_defaults_to_enabled() {
        assert!(toggle_enabled(None));
        assert!(toggle_enabled(Some("yes")));
        assert!(!toggle_enabled(Some(" OFF ")));
        assert!(!toggle_enabled(Some("0")));
    }

    #[test]
    fn loopback_http_is_allowed() {
        let allowed = ["http://localhost:5000", "http://127.0.0.1:5000", "http://[::1]:5000"];
        for raw in allowed {
            assert!(is_allowed_endpoint(&Url::parse(raw).expect("url")), "{raw}");
        }
        assert!(!is_allowed_endpoint(
            &Url::parse("http://engine.example").expect("url")
        ));
    }

    #[test]
    fn key_inside_word_is_not_redacted() {
        assert_eq!(
            redact_sensitive("Decrypting keyframe 12"),
            "Decrypting keyframe 12"
        );
        assert_eq!(redact_sensitive("monkey: 3"), "monkey: 3");
    }
}
