//! Stream core of a chat client that talks to a language-model backend over an
//! event stream and renders the answer while it is being generated.
//!
//! Bytes flow one way: network reads are decoded ([`ChunkDecoder`]), split
//! into events ([`EventFramer`]), parsed into typed [`StreamEvent`]s
//! ([`EventDispatcher`]) and applied to the session state, which calls back
//! into a [`Renderer`]. A [`StreamSession`] drives one request through that
//! pipeline; a [`ChatClient`] owns the running word counter across prompts.
//!
//! # Usage
//!
//! ```no_run
//! use chatstream_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let mut client = ChatClient::new(ClientConfig::new("http://localhost:5001").conversation_id(1))?;
//! let mut renderer = RecordingRenderer::new();
//!
//! let report = client.send("Say hello", &mut renderer).await?;
//! println!("{} ({} words)", report.text, client.word_total());
//! # Ok(())
//! # }
//! ```

/// Conversation-level client (delivery mode, running counter).
pub mod client;
/// Client and transport configuration.
pub mod config;
/// Incremental UTF-8 decoding of network reads.
pub mod decoder;
/// Payload parsing and per-event session updates.
pub mod dispatch;
/// Public error types.
pub mod errors;
/// Typed stream events.
pub mod event;
/// Blank-line event framing.
pub mod framer;
/// Request body and small shared enums.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Renderer interface and word accounting.
pub mod render;
/// Session state machine, cancellation and reports.
pub mod session;
/// Network transport contract and its HTTP implementation.
pub mod transport;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use decoder::ChunkDecoder;
pub use dispatch::{Applied, EventDispatcher, SessionState};
pub use errors::{ChatError, SessionFailure, TransportError};
pub use event::StreamEvent;
pub use framer::EventFramer;
pub use model::{ChatRequest, DeliveryMode, HealthStatus};
pub use observability::init_observability;
pub use render::{RecordingRenderer, Renderer, WordCounter, count_words};
pub use session::{
    AbortHandle, AbortSignal, SessionOptions, SessionPhase, SessionReport, StreamSession,
};
pub use transport::{ByteStream, HttpTransport, Transport};
