//! Integration tests for path validation through an injected probe.

use std::collections::HashSet;

use async_trait::async_trait;
use cipherframe_validate::{
    MSG_INVALID_PATH, MSG_REQUIRED, PathProbe, validate_path, validate_paths,
};

struct KnownPaths(HashSet<&'static str>);

#[async_trait]
impl PathProbe for KnownPaths {
    async fn exists(&self, path: &str) -> bool {
        self.0.contains(path)
    }
}

fn probe() -> KnownPaths {
    KnownPaths(["/videos/a.mp4", "/videos/b.mp4", "/out"].into_iter().collect())
}

#[tokio::test]
async fn path_validation_tests_required_empty_path_is_required() {
    let verdict = validate_path("   ", true, &probe()).await;
    assert!(!verdict.valid);
    assert_eq!(verdict.message, MSG_REQUIRED);
}

#[tokio::test]
async fn path_validation_tests_optional_empty_path_is_valid() {
    let verdict = validate_path("", false, &probe()).await;
    assert!(verdict.valid);
    assert!(verdict.message.is_empty());
}

#[tokio::test]
async fn path_validation_tests_missing_path_is_invalid() {
    let verdict = validate_path("/nope", false, &probe()).await;
    assert!(!verdict.valid);
    assert_eq!(verdict.message, MSG_INVALID_PATH);

    assert!(validate_path(" /out ", true, &probe()).await.valid);
}

#[tokio::test]
async fn path_validation_tests_multi_path_requires_every_entry() {
    let probe = probe();
    assert!(validate_paths("/videos/a.mp4\n\n/videos/b.mp4\n", true, &probe).await.valid);

    let verdict = validate_paths("/videos/a.mp4\n/videos/missing.mp4", true, &probe).await;
    assert_eq!(verdict.message, MSG_INVALID_PATH);

    let empty = validate_paths("\n \n", true, &probe).await;
    assert_eq!(empty.message, MSG_REQUIRED);
}
