use std::pin::Pin;

use futures::StreamExt as _;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::errors::{ChatError, TransportError};
use crate::model::{ChatRequest, HealthStatus};

/// Raw response body of a streaming request, one network read per item.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Network side of a chat exchange.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends a streaming request and returns the response body.
    ///
    /// A non-success status or a missing body is an error; the stream is only
    /// returned once the response is known to be readable.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;

    /// Sends a single-shot request and returns the complete response text.
    async fn generate(&self, request: &ChatRequest) -> Result<String, TransportError>;

    /// Probes the backend once.
    async fn health(&self) -> Result<HealthStatus, TransportError>;
}

/// `Transport` over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport from validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ChatError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[derive(serde::Deserialize)]
struct GenerateReply {
    resposta: Option<String>,
}

#[derive(serde::Deserialize)]
struct HealthReply {
    status: Option<String>,
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let url = self.config.stream_url();
        debug!(event = "transport.stream_request", url = %url, model = %request.model);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::network(format!("stream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let err = TransportError::status(status.as_u16(), body);
            warn!(
                event = "transport.stream_rejected",
                url = %url,
                status = status.as_u16(),
                body = err.body_excerpt().unwrap_or_default()
            );
            return Err(err);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::body(format!("stream read failed: {e}"))));
        Ok(Box::pin(body))
    }

    async fn generate(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let url = self.config.generate_url();
        debug!(event = "transport.generate_request", url = %url, model = %request.model);

        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::network(format!("generate request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::body(format!("generate read failed: {e}")))?;

        if !status.is_success() {
            return Err(TransportError::rejected(
                status.as_u16(),
                rejection_detail(&body),
            ));
        }

        let reply: GenerateReply = serde_json::from_str(&body).map_err(|e| {
            TransportError::protocol(format!("invalid generate response: {e}"))
        })?;
        reply
            .resposta
            .ok_or_else(|| TransportError::protocol("generate response has no `resposta` field"))
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        let response = self
            .client
            .get(self.config.health_url())
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| TransportError::network(format!("health probe failed: {e}")))?;
        if !response.status().is_success() {
            return Ok(HealthStatus::Offline);
        }
        let reply: HealthReply = response
            .json()
            .await
            .map_err(|e| TransportError::protocol(format!("invalid health response: {e}")))?;
        Ok(match reply.status.as_deref() {
            Some("healthy") => HealthStatus::Online,
            _ => HealthStatus::Offline,
        })
    }
}

/// Message to show for a rejected single-shot request.
///
/// Prefers the JSON `detail` field, then the raw body.
pub(crate) fn rejection_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .filter(|detail| !detail.trim().is_empty());
    match detail {
        Some(detail) => detail,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => "unknown server error".to_string(),
    }
}
