use std::time::Duration;

/// Errors returned by a `Transport` before they are normalized into a
/// session failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server answered the streaming request with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16, body: String },
    /// The server rejected a single-shot request and explained why.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    /// The request could not be sent or no response arrived.
    #[error("network error: {message}")]
    Network { message: String },
    /// Reading the response body failed midway.
    #[error("body read failed: {message}")]
    Body { message: String },
    /// The response arrived but its shape was not what the endpoint promises.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl TransportError {
    /// Creates a status error, keeping a bounded excerpt of the body for logs.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: excerpt(&body.into()),
        }
    }

    /// Creates a rejection carrying the server's explanation.
    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            detail: detail.into(),
        }
    }

    /// Creates a network-level error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a body read error.
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Bounded excerpt of the response body of a status error.
    pub fn body_excerpt(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Rejected { status, .. } => Some(*status),
            Self::Network { .. } | Self::Body { .. } | Self::Protocol { .. } => None,
        }
    }
}

const BODY_EXCERPT_CHARS: usize = 256;

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    out.push('…');
    out
}

/// Terminal failure of a session, surfaced to the renderer and the report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    /// The transport failed before or during streaming.
    #[error("{message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
        /// Excerpt of the error response body, when the server sent one.
        body: Option<String>,
    },
    /// A read stalled longer than the configured bound.
    #[error("stream stalled for {after:?} without data")]
    Timeout { after: Duration },
    /// The caller aborted the session.
    #[error("request cancelled")]
    Cancelled,
}

impl From<&TransportError> for SessionFailure {
    fn from(err: &TransportError) -> Self {
        SessionFailure::Transport {
            message: err.to_string(),
            status_code: err.status_code(),
            body: err.body_excerpt().map(str::to_string),
        }
    }
}

impl From<TransportError> for SessionFailure {
    fn from(err: TransportError) -> Self {
        SessionFailure::from(&err)
    }
}

/// Top-level error type for the client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (empty prompt, empty model, ...).
    #[error("validation error: {0}")]
    Validation(String),
    /// Transport failure outside of a session (for example a health probe).
    #[error(transparent)]
    Transport(TransportError),
}

impl From<TransportError> for ChatError {
    fn from(value: TransportError) -> Self {
        ChatError::Transport(value)
    }
}
