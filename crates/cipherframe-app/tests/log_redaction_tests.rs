//! Integration tests for log redaction.

use cipherframe_app::redact_sensitive;

#[test]
fn log_redaction_tests_removes_secret_values() {
    let redacted = redact_sensitive("authorization=Bearer abc123");
    assert!(redacted.contains("<redacted>"));
    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_drops_everything_after_password() {
    let redacted = redact_sensitive("starting job password: hunter2 key=/keys/a.key");
    assert_eq!(redacted, "starting job password=<redacted>");
}

#[test]
fn log_redaction_tests_handles_json_keys() {
    let redacted = redact_sensitive(r#"{"process":"decrypt","password":"hunter2"}"#);
    assert!(!redacted.contains("hunter2"));
    assert!(redacted.starts_with(r#"{"process":"decrypt",""#));
}

#[test]
fn log_redaction_tests_leaves_progress_lines_alone() {
    let line = "Encrypting frame 12/300 (keyframe)";
    assert_eq!(redact_sensitive(line), line);
}
