//! Shared fixtures for app integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cipherframe_app::{AppConfig, DatasetSource, Session};
use cipherframe_core::{JobArtifacts, JobEvent, JobKind, JobStage};
use cipherframe_engine::{EngineTransport, ProgressStream, TransportError};
use cipherframe_metrics::{MetricDataset, MetricsError};
use cipherframe_validate::PathProbe;
use cipherframe_wizard::{NoDialogs, Wizard};
use futures_util::StreamExt;

pub const ENCRYPTION_CSV: &str = "\
Frame,Entropy,Entropy_R,Entropy_G,Entropy_B,NPCR,UACI,Correlation_Horizontal,Correlation_Vertical,Correlation_Diagonal,Time
1,7.99,7.99,7.99,7.99,99.61,33.4,0.01,-0.02,0.003,0.040
Mean,7.99,7.99,7.99,7.99,99.61,33.4,0.01,-0.02,0.003,0.040
";

/// Engine fake replaying one scripted event list per progress stream.
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<(JobStage, Vec<JobEvent>)>>,
    pub submitted: Mutex<Vec<(JobStage, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<(JobStage, Vec<JobEvent>)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            submitted: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl EngineTransport for ScriptedTransport {
    async fn submit(&self, stage: JobStage, body: &serde_json::Value) -> Result<(), TransportError> {
        self.submitted
            .lock()
            .expect("lock")
            .push((stage, body.clone()));
        Ok(())
    }

    async fn open_progress(
        &self,
        _kind: JobKind,
        stage: JobStage,
    ) -> Result<ProgressStream, TransportError> {
        let mut scripts = self.scripts.lock().expect("lock");
        match scripts.pop_front() {
            Some((scripted_stage, events)) if scripted_stage == stage => {
                let frames: Vec<Result<String, TransportError>> = events
                    .iter()
                    .map(|event| Ok(serde_json::to_string(event).expect("event encodes")))
                    .collect();
                Ok(futures_util::stream::iter(frames).boxed())
            }
            _ => Err(TransportError::Connection("no scripted stream".to_string())),
        }
    }

    async fn halt(&self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }
}

pub struct FixedProbe(pub HashSet<String>);

#[async_trait]
impl PathProbe for FixedProbe {
    async fn exists(&self, path: &str) -> bool {
        self.0.contains(path)
    }
}

pub struct InMemoryDatasets(pub HashMap<String, &'static str>);

#[async_trait]
impl DatasetSource for InMemoryDatasets {
    async fn load(&self, path: &str) -> Result<MetricDataset, MetricsError> {
        let csv = self.0.get(path).ok_or_else(|| {
            MetricsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        })?;
        MetricDataset::from_csv_reader(csv.as_bytes())
    }
}

pub fn fixture_config(evaluate: bool) -> AppConfig {
    let mut config = AppConfig::from_lookup(|_| None).expect("default config is valid");
    config.evaluate = evaluate;
    config
}

pub fn fixture_session(
    kind: JobKind,
    transport: Arc<ScriptedTransport>,
    evaluate: bool,
) -> Session {
    let probe = FixedProbe(
        ["/videos/clip.mp4", "/keys", "/keys/clip.key", "/out"]
            .into_iter()
            .map(str::to_string)
            .collect(),
    );
    let wizard = Wizard::new(kind, Arc::new(probe), Arc::new(NoDialogs));
    let datasets = InMemoryDatasets(
        [("/out/clip_metrics.csv".to_string(), ENCRYPTION_CSV)]
            .into_iter()
            .collect(),
    );
    Session::new(
        fixture_config(evaluate),
        wizard,
        transport,
        Arc::new(datasets),
    )
}

pub fn processing_success() -> JobEvent {
    JobEvent::success(
        "Encryption finished",
        JobArtifacts {
            input_files: vec!["clip.mp4".to_string()],
            input_filepaths: vec!["/videos/clip.mp4".to_string()],
            algorithm: Some("FY-Logistic".to_string()),
            output_dirpath: Some("/out".to_string()),
            output_filepaths: vec!["/out/clip_encrypted.mp4".to_string()],
            time_filepaths: vec!["/out/clip_time.csv".to_string()],
            ..JobArtifacts::default()
        },
    )
}

pub fn evaluation_success() -> JobEvent {
    JobEvent::success(
        "Evaluation finished",
        JobArtifacts {
            input_files: vec!["clip.mp4".to_string()],
            output_filepaths: vec!["/out/clip_metrics.csv".to_string()],
            resolutions: vec![(1920, 1080)],
            baseline_speed_metrics: vec![vec![0.05, 0.045]],
            ..JobArtifacts::default()
        },
    )
}
