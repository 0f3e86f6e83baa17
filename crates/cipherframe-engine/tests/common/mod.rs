//! Shared fixtures for orchestrator tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cipherframe_core::{
    Algorithm, JobArtifacts, JobEvent, JobKind, JobRequest, JobStage,
};
use cipherframe_engine::{
    EngineTransport, JobOrchestrator, OrchestratorConfig, ProgressStream, TransportError,
};
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};

type Frame = Result<String, TransportError>;

/// In-memory engine: frames are pushed by the test, halt (and optionally
/// submit) waits on a gate.
pub struct FakeTransport {
    pub submitted: Mutex<Vec<(JobStage, serde_json::Value)>>,
    pub opened: Mutex<Vec<(JobKind, JobStage)>>,
    pub halt_calls: AtomicUsize,
    submit_error: Option<String>,
    open_error: Option<String>,
    halt_reply: Option<String>,
    frames: Mutex<Option<mpsc::UnboundedReceiver<Frame>>>,
    submit_gate: Mutex<Option<oneshot::Receiver<()>>>,
    halt_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

#[async_trait]
impl EngineTransport for FakeTransport {
    async fn submit(&self, stage: JobStage, body: &serde_json::Value) -> Result<(), TransportError> {
        self.submitted
            .lock()
            .expect("lock")
            .push((stage, body.clone()));
        let gate = self.submit_gate.lock().expect("lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match &self.submit_error {
            Some(detail) => Err(TransportError::Connection(detail.clone())),
            None => Ok(()),
        }
    }

    async fn open_progress(
        &self,
        kind: JobKind,
        stage: JobStage,
    ) -> Result<ProgressStream, TransportError> {
        self.opened.lock().expect("lock").push((kind, stage));
        if let Some(detail) = &self.open_error {
            return Err(TransportError::Connection(detail.clone()));
        }
        let receiver = self
            .frames
            .lock()
            .expect("lock")
            .take()
            .ok_or_else(|| TransportError::Stream("stream already consumed".to_string()))?;
        let stream = futures_util::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|frame| (frame, receiver))
        });
        Ok(stream.boxed())
    }

    async fn halt(&self) -> Result<Option<String>, TransportError> {
        self.halt_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.halt_gate.lock().expect("lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self.halt_reply.clone())
    }
}

/// Handle the test keeps to drive the fake engine.
pub struct FakeEngine {
    pub transport: Arc<FakeTransport>,
    pub frames: Option<mpsc::UnboundedSender<Frame>>,
    pub submit_release: Option<oneshot::Sender<()>>,
    pub halt_release: Option<oneshot::Sender<()>>,
}

impl FakeEngine {
    pub fn push(&self, event: &JobEvent) {
        let raw = serde_json::to_string(event).expect("event encodes");
        self.push_raw(&raw);
    }

    pub fn push_raw(&self, raw: &str) {
        if let Some(frames) = &self.frames {
            let _ = frames.send(Ok(raw.to_string()));
        }
    }

    /// Ends the stream without a terminal event.
    pub fn drop_stream(&mut self) {
        self.frames = None;
    }

    pub fn release_submit(&mut self) {
        if let Some(release) = self.submit_release.take() {
            let _ = release.send(());
        }
    }

    pub fn release_halt(&mut self) {
        if let Some(release) = self.halt_release.take() {
            let _ = release.send(());
        }
    }

    pub fn orchestrator(&self, config: OrchestratorConfig) -> JobOrchestrator {
        JobOrchestrator::new(self.transport.clone(), config)
    }
}

#[derive(Default)]
pub struct FakeOptions {
    pub submit_error: Option<String>,
    pub open_error: Option<String>,
    pub halt_reply: Option<String>,
    /// Keeps `submit` pending until [`FakeEngine::release_submit`].
    pub submit_gate: bool,
}

pub fn fake_engine(options: FakeOptions) -> FakeEngine {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = oneshot::channel();
    let (submit_tx, submit_rx) = if options.submit_gate {
        let (tx, rx) = oneshot::channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let transport = FakeTransport {
        submitted: Mutex::new(Vec::new()),
        opened: Mutex::new(Vec::new()),
        halt_calls: AtomicUsize::new(0),
        submit_error: options.submit_error,
        open_error: options.open_error,
        halt_reply: options.halt_reply,
        frames: Mutex::new(Some(frames_rx)),
        submit_gate: Mutex::new(submit_rx),
        halt_gate: Mutex::new(Some(release_rx)),
    };
    FakeEngine {
        transport: Arc::new(transport),
        frames: Some(frames_tx),
        submit_release: submit_tx,
        halt_release: Some(release_tx),
    }
}

pub fn decrypt_request() -> JobRequest {
    JobRequest::new(
        JobKind::Decrypt,
        Algorithm::FyLogistic,
        vec!["/videos/clip_encrypted.mp4".to_string()],
    )
    .expect("valid request")
    .with_output_dir("/out")
    .with_password("hunter2")
    .with_key_path("/keys/clip.key")
}

pub fn encrypt_request() -> JobRequest {
    JobRequest::new(
        JobKind::Encrypt,
        Algorithm::Cosine3d,
        vec!["/videos/clip.mp4".to_string()],
    )
    .expect("valid request")
    .with_output_dir("/out")
    .with_password("Str0ng!Pass")
}

pub fn encrypt_success() -> JobEvent {
    JobEvent::success(
        "Encryption finished",
        JobArtifacts {
            input_files: vec!["clip.mp4".to_string()],
            input_filepaths: vec!["/videos/clip.mp4".to_string()],
            algorithm: Some("3D-Cosine".to_string()),
            output_dirpath: Some("/out".to_string()),
            output_filepaths: vec!["/out/clip_encrypted.mp4".to_string()],
            time_filepaths: vec!["/out/clip_time.csv".to_string()],
            resolutions: vec![(1920, 1080)],
            baseline_speed_metrics: vec![vec![0.5, 0.4]],
        },
    )
}
