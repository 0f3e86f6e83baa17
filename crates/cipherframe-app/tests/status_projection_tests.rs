//! Integration tests for runtime status projection.

use cipherframe_app::project_status;
use cipherframe_engine::{JobFailure, JobOutcome, JobPhase, JobSnapshot, TerminalAction};

#[test]
fn status_projection_tests_streaming_allows_halt() {
    let snapshot = JobSnapshot {
        job_id: 3,
        phase: JobPhase::Streaming,
        message: "Decrypting frame 4 password=hunter2".to_string(),
        outcome: None,
    };

    let status = project_status(&snapshot);
    assert_eq!(status.phase, "Streaming");
    assert!(status.can_halt);
    assert!(!status.message.contains("hunter2"));
    assert_eq!(status.description, None);
    assert!(status.actions.is_empty());
}

#[test]
fn status_projection_tests_terminal_offers_actions() {
    let snapshot = JobSnapshot {
        job_id: 3,
        phase: JobPhase::Failure,
        message: String::new(),
        outcome: Some(JobOutcome::Failure(JobFailure::Stream {
            detail: "eof".to_string(),
        })),
    };

    let status = project_status(&snapshot);
    assert!(!status.can_halt);
    assert_eq!(
        status.description.as_deref(),
        Some("Connection to the processing engine was lost.")
    );
    assert_eq!(
        status.actions,
        vec![TerminalAction::TryAgain, TerminalAction::ReturnHome]
    );
}
