//! Tests init request bodies and evaluation request derivation.

use cipherframe_core::{
    Algorithm, CoreError, EvaluationRequest, JobKind, JobRequest, JobResult, JobStage,
    JobSubmission,
};

fn processing_result() -> JobResult {
    JobResult {
        kind: JobKind::Encrypt,
        stage: JobStage::Processing,
        input_files: vec!["clip.mp4".to_string()],
        input_paths: vec!["/videos/clip.mp4".to_string()],
        algorithm: Some("3D-Cosine".to_string()),
        output_dir: Some("/out".to_string()),
        output_paths: vec!["/out/clip_encrypted.mp4".to_string()],
        time_paths: vec![],
        resolutions: vec![],
        baseline_speeds: vec![],
        dataset_paths: vec![],
    }
}

#[test]
fn submission_body_tests_encode_process_fields() {
    let request = JobRequest::new(
        JobKind::Encrypt,
        Algorithm::FyLogistic,
        vec!["/videos/clip.mp4".to_string()],
    )
    .expect("request should build")
    .with_output_dir("")
    .with_password("Str0ng!Pwd")
    .with_key_path("/keys");

    let body = JobSubmission::from(request)
        .to_body()
        .expect("body should encode");
    assert_eq!(body["process"], "encrypt");
    assert_eq!(body["algorithm"], "FY-Logistic");
    assert_eq!(body["input_filepaths"][0], "/videos/clip.mp4");
    assert!(body["output_dirpath"].is_null());
    assert_eq!(body["password"], "Str0ng!Pwd");
    assert_eq!(body["key_filepath"], "/keys");
}

#[test]
fn submission_body_tests_evaluation_prefers_engine_algorithm() {
    let request = EvaluationRequest::from_result(&processing_result(), Algorithm::FyLogistic)
        .expect("evaluation request should build");
    assert_eq!(request.algorithm, Algorithm::Cosine3d);

    let submission = JobSubmission::from(request);
    assert_eq!(submission.stage(), JobStage::Evaluating);
    let body = submission.to_body().expect("body should encode");
    assert_eq!(body["process"], "encrypt");
    assert_eq!(body["output_filepaths"][0], "/out/clip_encrypted.mp4");
}

#[test]
fn submission_body_tests_evaluation_requires_outputs() {
    let mut result = processing_result();
    result.output_paths.clear();
    assert!(matches!(
        EvaluationRequest::from_result(&result, Algorithm::FyLogistic),
        Err(CoreError::MissingOutputs)
    ));

    let mut evaluated = processing_result();
    evaluated.stage = JobStage::Evaluating;
    assert!(matches!(
        EvaluationRequest::from_result(&evaluated, Algorithm::FyLogistic),
        Err(CoreError::NotAProcessingResult)
    ));
}
