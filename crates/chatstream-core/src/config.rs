use std::time::Duration;

use crate::errors::ChatError;

/// Default backend address (the web front end that proxies the model API).
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "Qwen3-4B-Instruct-2507-4bit";

/// Configuration for the chat client and its HTTP transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the chat backend.
    pub base_url: String,
    /// Path of the streaming endpoint.
    pub stream_path: String,
    /// Path of the single-shot endpoint.
    pub generate_path: String,
    /// Path of the health probe.
    pub health_path: String,
    /// Bound on connecting, and on the whole exchange for single-shot
    /// requests and health probes.
    pub request_timeout: Duration,
    /// Longest wait for the next chunk of a stream. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Model sent with every request.
    pub model: String,
    /// Conversation sent with every request.
    pub conversation_id: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: "/api/stream".to_string(),
            generate_path: "/api/generate".to_string(),
            health_path: "/health".to_string(),
            request_timeout: Duration::from_secs(60),
            read_timeout: Some(Duration::from_secs(300)),
            model: DEFAULT_MODEL.to_string(),
            conversation_id: None,
        }
    }
}

impl ClientConfig {
    /// Creates a config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from the environment.
    ///
    /// - `CHATSTREAM_BASE_URL` (default `http://localhost:5001`)
    /// - `CHATSTREAM_MODEL`
    /// - `CHATSTREAM_CHAT_ID`
    /// - `CHATSTREAM_READ_TIMEOUT_SECS` (`0` disables the read timeout)
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ChatError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        if let Some(base_url) = non_empty("CHATSTREAM_BASE_URL") {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(model) = non_empty("CHATSTREAM_MODEL") {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = non_empty("CHATSTREAM_CHAT_ID") {
            let id = raw.trim().parse::<u64>().map_err(|e| {
                ChatError::Config(format!("CHATSTREAM_CHAT_ID must be an integer: {e}"))
            })?;
            config.conversation_id = Some(id);
        }
        if let Some(raw) = non_empty("CHATSTREAM_READ_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                ChatError::Config(format!(
                    "CHATSTREAM_READ_TIMEOUT_SECS must be a number of seconds: {e}"
                ))
            })?;
            config.read_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Overrides the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the conversation id.
    pub fn conversation_id(mut self, conversation_id: u64) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Overrides the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the stream read timeout.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Checks the fields the transport relies on.
    pub fn validate(&self) -> Result<(), ChatError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ChatError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ChatError::Config(format!(
                "base_url must start with http:// or https:// (got {base})"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::Config("model must not be empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ChatError::Config(
                "request_timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn stream_url(&self) -> String {
        self.url(&self.stream_path)
    }

    pub(crate) fn generate_url(&self) -> String {
        self.url(&self.generate_path)
    }

    pub(crate) fn health_url(&self) -> String {
        self.url(&self.health_path)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
