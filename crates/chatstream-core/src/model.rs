use std::fmt;

/// Body of a generation request, shared by the streaming and instant paths.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
    /// Backend model name.
    pub model: String,
    /// The user's prompt, already trimmed.
    pub prompt: String,
    /// Conversation the exchange belongs to. The backend rejects bodies
    /// without it.
    #[serde(rename = "chat_id", alias = "conversationId")]
    pub conversation_id: u64,
}

impl ChatRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        conversation_id: u64,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            conversation_id,
        }
    }
}

/// How responses are delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Tokens are rendered as they arrive.
    #[default]
    Streaming,
    /// One request, one complete response.
    Instant,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryMode::Streaming => "streaming",
            DeliveryMode::Instant => "instant",
        })
    }
}

/// Result of a one-shot health probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Online,
    Offline,
}
