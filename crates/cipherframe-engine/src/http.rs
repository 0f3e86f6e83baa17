//! HTTP + server-sent-events transport to the processing engine.

use std::time::Duration;

use async_trait::async_trait;
use cipherframe_core::{JobKind, JobStage};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    EngineTransport, HALT_PATH, ProgressStream, TransportError, init_path, progress_path,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Deserialize)]
struct HaltReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`EngineTransport`] over the engine's HTTP API.
///
/// Endpoints are resolved relative to the base URL, so a base with a path
/// prefix such as `https://host/engine` is preserved.
#[derive(Debug, Clone)]
pub struct HttpEngineTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpEngineTransport {
    /// Creates a transport for `base_url`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidEndpoint`] when the URL does not parse
    /// or is not `http(s)`, and [`TransportError::Connection`] when the client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|error| TransportError::InvalidEndpoint(error.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                base.scheme()
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|error| TransportError::Connection(error.to_string()))?;

        Ok(Self { client, base })
    }

    /// Base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|error| TransportError::InvalidEndpoint(error.to_string()))
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status(status.as_u16()))
    }
}

fn connection(error: reqwest::Error) -> TransportError {
    TransportError::Connection(error.to_string())
}

/// Extracts the human-readable halt reply from a response body.
fn parse_halt_reply(body: &str) -> Option<String> {
    let text = match serde_json::from_str::<HaltReply>(body) {
        Ok(reply) => reply.message.or(reply.status).unwrap_or_default(),
        Err(_) => body.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl EngineTransport for HttpEngineTransport {
    async fn submit(&self, stage: JobStage, body: &serde_json::Value) -> Result<(), TransportError> {
        let url = self.endpoint(init_path(stage))?;
        debug!(endpoint = %url, "posting job initiation");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(connection)?;
        check_status(response)?;
        Ok(())
    }

    async fn open_progress(
        &self,
        kind: JobKind,
        stage: JobStage,
    ) -> Result<ProgressStream, TransportError> {
        let url = self.endpoint(&progress_path(kind, stage))?;
        debug!(endpoint = %url, "opening progress stream");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM))
            .send()
            .await
            .map_err(connection)?;
        let response = check_status(response)?;

        let frames = response
            .bytes_stream()
            .eventsource()
            .map(|event| match event {
                Ok(event) => Ok(event.data),
                Err(error) => Err(TransportError::Stream(error.to_string())),
            });
        Ok(frames.boxed())
    }

    async fn halt(&self) -> Result<Option<String>, TransportError> {
        let url = self.endpoint(HALT_PATH)?;
        let response = self.client.post(url).send().await.map_err(connection)?;
        let response = check_status(response)?;
        let body = response.text().await.map_err(connection)?;
        Ok(parse_halt_reply(&body))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint resolution and halt reply parsing.

    use super::*;

    #[test]
    fn base_path_prefix_is_preserved() {
        let transport = HttpEngineTransport::new("https://engine.example/api").expect("valid url");
        assert_eq!(transport.base_url().as_str(), "https://engine.example/api/");
        let url = transport
            .endpoint(&progress_path(JobKind::Encrypt, JobStage::Evaluating))
            .expect("joins");
        assert_eq!(url.as_str(), "https://engine.example/api/encrypt/evaluating");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(matches!(
            HttpEngineTransport::new("ftp://engine.example"),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn halt_reply_prefers_message_then_status_then_text() {
        assert_eq!(
            parse_halt_reply(r#"{"status":"halted","message":"Stopped at frame 12"}"#),
            Some("Stopped at frame 12".to_string())
        );
        assert_eq!(
            parse_halt_reply(r#"{"status":"halted"}"#),
            Some("halted".to_string())
        );
        assert_eq!(parse_halt_reply(" Halting \n"), Some("Halting".to_string()));
        assert_eq!(parse_halt_reply("   "), None);
    }
}
