//! Validates fixtures and live encodings against the frozen JSON schemas.

use cipherframe_contract_tests::{compile_validator, load_json};
use cipherframe_core::{
    Algorithm, EvaluationRequest, JobArtifacts, JobEvent, JobKind, JobRequest, JobSubmission,
};

const INIT_SCHEMA: &str = "job-init-request.schema.json";
const EVALUATION_SCHEMA: &str = "evaluation-request.schema.json";
const EVENT_SCHEMA: &str = "job-event.schema.json";

#[test]
fn contract_validation_tests_fixtures_match_schemas() {
    let cases = [
        (INIT_SCHEMA, "fixtures/job-init-request.valid.json"),
        (EVALUATION_SCHEMA, "fixtures/evaluation-request.valid.json"),
        (EVENT_SCHEMA, "fixtures/job-event.success.valid.json"),
        (EVENT_SCHEMA, "fixtures/job-event.failure.valid.json"),
    ];
    for (schema, fixture) in cases {
        let validator = compile_validator(schema);
        assert!(
            validator.is_valid(&load_json(fixture)),
            "{fixture} should validate against {schema}"
        );
    }
}

#[test]
fn contract_validation_tests_invalid_fixture_is_rejected() {
    let validator = compile_validator(INIT_SCHEMA);
    assert!(!validator.is_valid(&load_json("fixtures/job-init-request.invalid.json")));
}

#[test]
fn contract_validation_tests_encoded_init_body_matches_schema() {
    let request = JobRequest::new(
        JobKind::Decrypt,
        Algorithm::Cosine3d,
        vec!["/videos/clip_encrypted.mp4".to_string()],
    )
    .expect("valid request")
    .with_password("secret")
    .with_key_path("/keys/clip.key");
    let body = JobSubmission::from(request).to_body().expect("encodes");

    assert!(compile_validator(INIT_SCHEMA).is_valid(&body));
}

#[test]
fn contract_validation_tests_encoded_evaluation_body_matches_schema() {
    let request = EvaluationRequest {
        kind: JobKind::Encrypt,
        algorithm: Algorithm::FyLogistic,
        input_paths: vec!["/videos/clip.mp4".to_string()],
        output_paths: vec!["/out/clip_encrypted.mp4".to_string()],
    };
    let body = JobSubmission::from(request).to_body().expect("encodes");

    assert!(compile_validator(EVALUATION_SCHEMA).is_valid(&body));
}

#[test]
fn contract_validation_tests_encoded_events_match_schema() {
    let validator = compile_validator(EVENT_SCHEMA);
    let events = [
        JobEvent::running("Encrypting frame 1/2"),
        JobEvent::failure("WRONG PASSWORD"),
        JobEvent::success(
            "done",
            JobArtifacts {
                output_filepaths: vec!["/out/clip.csv".to_string()],
                resolutions: vec![(1280, 720)],
                ..JobArtifacts::default()
            },
        ),
    ];
    for event in events {
        let value = serde_json::to_value(&event).expect("event encodes");
        assert!(validator.is_valid(&value), "{value} should match schema");
    }
}
