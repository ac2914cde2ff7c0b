use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::errors::{ChatError, SessionFailure};
use crate::model::{ChatRequest, DeliveryMode, HealthStatus};
use crate::render::{Renderer, WordCounter};
use crate::session::{
    AbortSignal, SessionOptions, SessionPhase, SessionReport, StreamSession, finalize,
};
use crate::transport::{HttpTransport, Transport};

/// Conversation-level client: picks the delivery path for each prompt and
/// keeps the running word counter across exchanges.
///
/// `send` takes `&mut self`, so at most one exchange is active per client.
pub struct ChatClient<T: Transport = HttpTransport> {
    transport: T,
    config: ClientConfig,
    counter: WordCounter,
    mode: DeliveryMode,
}

impl ChatClient<HttpTransport> {
    /// Creates a client talking HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self, ChatError> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::with_transport(transport, config))
    }

    /// Creates a client from `CHATSTREAM_*` environment variables.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> ChatClient<T> {
    /// Creates a client over any transport.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            counter: WordCounter::new(),
            mode: DeliveryMode::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Switches between streaming and instant delivery for later prompts.
    pub fn set_mode(&mut self, mode: DeliveryMode) {
        debug!(event = "client.mode_changed", mode = %mode);
        self.mode = mode;
    }

    /// Selects the model for later prompts.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// Words committed by every exchange since the last `clear`.
    pub fn word_total(&self) -> usize {
        self.counter.total()
    }

    /// Starts a fresh conversation view: the running counter goes back to 0.
    pub fn clear(&mut self) {
        self.counter.reset();
    }

    /// Probes the backend once. Any failure counts as offline.
    pub async fn health(&self) -> HealthStatus {
        match self.transport.health().await {
            Ok(status) => status,
            Err(err) => {
                debug!(event = "client.health_failed", error = %err);
                HealthStatus::Offline
            }
        }
    }

    /// Sends `prompt` and drives the exchange to completion.
    pub async fn send(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<SessionReport, ChatError> {
        self.send_with_abort(prompt, renderer, AbortSignal::never())
            .await
    }

    /// Like `send`, cancelled when `signal` fires.
    ///
    /// Only input validation errors are returned as `Err`; every failure after
    /// the request starts ends up in the report, after finalization.
    pub async fn send_with_abort(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
        signal: AbortSignal,
    ) -> Result<SessionReport, ChatError> {
        let request = self.build_request(prompt)?;
        let report = match self.mode {
            DeliveryMode::Streaming => {
                let options = SessionOptions::default()
                    .read_timeout(self.config.read_timeout)
                    .abort(signal);
                StreamSession::new(request, options)
                    .run(&self.transport, renderer, &mut self.counter)
                    .await
            }
            DeliveryMode::Instant => self.run_instant(request, renderer, signal).await,
        };
        Ok(report)
    }

    fn build_request(&self, prompt: &str) -> Result<ChatRequest, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::Validation("prompt must not be empty".into()));
        }
        let model = self.config.model.trim();
        if model.is_empty() {
            return Err(ChatError::Validation("model must not be empty".into()));
        }
        let conversation_id = self.config.conversation_id.ok_or_else(|| {
            ChatError::Validation(
                "conversation id is required (set CHATSTREAM_CHAT_ID or --chat-id)".into(),
            )
        })?;
        Ok(ChatRequest::new(model, prompt, conversation_id))
    }

    async fn run_instant(
        &mut self,
        request: ChatRequest,
        renderer: &mut dyn Renderer,
        mut signal: AbortSignal,
    ) -> SessionReport {
        let session_id = uuid::Uuid::new_v4();
        info!(event = "instant.started", session_id = %session_id, model = %request.model);

        let outcome = tokio::select! {
            biased;
            _ = signal.aborted() => Err(SessionFailure::Cancelled),
            reply = self.transport.generate(&request) => reply.map_err(SessionFailure::from),
        };

        let (phase, text, failure) = match outcome {
            Ok(text) => {
                renderer.render(&text);
                (SessionPhase::Completed, text, None)
            }
            Err(failure) => {
                warn!(event = "instant.failed", session_id = %session_id, error = %failure);
                renderer.report_error(&failure.to_string());
                (SessionPhase::Failed, String::new(), Some(failure))
            }
        };

        let words_added = finalize(renderer, &mut self.counter, &text);
        info!(event = "instant.finalized", session_id = %session_id, phase = ?phase, words_added = words_added as u64);

        let completed = phase == SessionPhase::Completed;
        SessionReport {
            session_id,
            phase,
            text,
            words_added,
            events: u64::from(completed),
            skipped_payloads: 0,
            saw_done: completed,
            upstream_error: None,
            failure,
        }
    }
}
