//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, ChatClient, ChatError, ClientConfig, DeliveryMode, HealthStatus,
    RecordingRenderer, Renderer, SessionPhase, SessionReport, StreamEvent,
};
