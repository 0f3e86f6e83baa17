//! Shared fakes for wizard integration tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cipherframe_core::JobKind;
use cipherframe_validate::PathProbe;
use cipherframe_wizard::{DialogProvider, NoDialogs, Wizard};

/// Probe backed by a fixed set of existing paths.
///
/// Paths containing `slow` resolve after a short delay to exercise
/// out-of-order validation.
pub struct FixtureProbe {
    existing: HashSet<String>,
}

#[async_trait]
impl PathProbe for FixtureProbe {
    async fn exists(&self, path: &str) -> bool {
        if path.contains("slow") {
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        self.existing.contains(path)
    }
}

/// Creates the standard fixture probe.
#[allow(dead_code)]
pub fn fixture_probe() -> Arc<FixtureProbe> {
    Arc::new(FixtureProbe {
        existing: [
            "/videos/clip.mp4",
            "/videos/second.mp4",
            "/videos/slow.mp4",
            "/keys",
            "/keys/clip.key",
            "/out",
        ]
        .into_iter()
        .map(str::to_string)
        .collect(),
    })
}

/// Dialog provider returning canned selections.
#[allow(dead_code)]
pub struct CannedDialogs {
    pub files: Option<Vec<String>>,
    pub file: Option<String>,
    pub folder: Option<String>,
}

#[async_trait]
impl DialogProvider for CannedDialogs {
    async fn pick_files(&self) -> Option<Vec<String>> {
        self.files.clone()
    }

    async fn pick_file(&self) -> Option<String> {
        self.file.clone()
    }

    async fn pick_folder(&self) -> Option<String> {
        self.folder.clone()
    }
}

/// Wizard wired to the fixture probe and no dialogs.
#[allow(dead_code)]
pub fn fixture_wizard(kind: JobKind) -> Wizard {
    Wizard::new(kind, fixture_probe(), Arc::new(NoDialogs))
}
