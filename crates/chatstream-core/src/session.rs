use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::decoder::ChunkDecoder;
use crate::dispatch::{EventDispatcher, SessionState};
use crate::errors::SessionFailure;
use crate::framer::EventFramer;
use crate::model::ChatRequest;
use crate::render::{Renderer, WordCounter};
use crate::transport::{ByteStream, Transport};

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

/// Handle used to cancel a running session.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Requests cancellation. The session observes it at its next suspension
    /// point and fails with `SessionFailure::Cancelled`.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns the receiving side to hand to a session.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of an `AbortHandle`.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        AbortHandle::new().signal()
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested.
    ///
    /// Pends forever if every handle was dropped without aborting.
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Per-session behavior.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    /// Longest wait for the next chunk before failing with a timeout.
    pub read_timeout: Option<Duration>,
    /// Cancellation signal honored while requesting and at every read.
    pub abort: Option<AbortSignal>,
}

impl SessionOptions {
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn abort(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }
}

/// Outcome of one session, returned after finalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: uuid::Uuid,
    /// `Completed` or `Failed`.
    pub phase: SessionPhase,
    /// Full response text accumulated before the session ended.
    pub text: String,
    /// Words committed to the running counter by finalization.
    pub words_added: usize,
    /// Events that changed the session state.
    pub events: u64,
    /// Payload lines dropped because they did not parse.
    pub skipped_payloads: u64,
    /// Whether upstream sent its `done` event.
    pub saw_done: bool,
    /// Message of an upstream `error` event, if one arrived.
    pub upstream_error: Option<String>,
    /// Local failure that ended the session, if any.
    pub failure: Option<SessionFailure>,
}

impl SessionReport {
    /// True when the stream ended normally and upstream reported no error.
    pub fn is_success(&self) -> bool {
        self.phase == SessionPhase::Completed && self.upstream_error.is_none()
    }
}

/// Drives one streaming request from the first byte to finalization.
///
/// `run` consumes the session, so finalization happens exactly once whichever
/// terminal phase is reached.
pub struct StreamSession {
    id: uuid::Uuid,
    request: ChatRequest,
    options: SessionOptions,
    phase: SessionPhase,
    decoder: ChunkDecoder,
    framer: EventFramer,
    dispatcher: EventDispatcher,
    state: SessionState,
}

impl StreamSession {
    pub fn new(request: ChatRequest, options: SessionOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            request,
            options,
            phase: SessionPhase::Idle,
            decoder: ChunkDecoder::new(),
            framer: EventFramer::new(),
            dispatcher: EventDispatcher::new(),
            state: SessionState::new(),
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Runs the request to a terminal phase, then finalizes.
    pub async fn run(
        mut self,
        transport: &dyn Transport,
        renderer: &mut dyn Renderer,
        counter: &mut WordCounter,
    ) -> SessionReport {
        let mut signal = self.options.abort.take().unwrap_or_else(AbortSignal::never);
        info!(event = "session.started", session_id = %self.id, model = %self.request.model);
        self.state.set_active(true);
        let outcome = self.drive(transport, renderer, &mut signal).await;
        self.finish(outcome, renderer, counter)
    }

    async fn drive(
        &mut self,
        transport: &dyn Transport,
        renderer: &mut dyn Renderer,
        signal: &mut AbortSignal,
    ) -> Result<(), SessionFailure> {
        self.transition(SessionPhase::Requesting);
        let mut body = tokio::select! {
            biased;
            _ = signal.aborted() => return Err(SessionFailure::Cancelled),
            opened = transport.open_stream(&self.request) => opened?,
        };

        self.transition(SessionPhase::Streaming);
        let read_timeout = self.options.read_timeout;
        loop {
            let next = tokio::select! {
                biased;
                _ = signal.aborted() => return Err(SessionFailure::Cancelled),
                next = read_next(&mut body, read_timeout) => next?,
            };
            match next {
                Some(chunk) => self.ingest(&chunk, false, renderer),
                None => {
                    self.ingest(&[], true, renderer);
                    return Ok(());
                }
            }
        }
    }

    fn ingest(&mut self, chunk: &[u8], final_call: bool, renderer: &mut dyn Renderer) {
        let text = self.decoder.decode(chunk, final_call);
        if text.is_empty() {
            return;
        }
        for raw_event in self.framer.push(&text) {
            for parsed in self.dispatcher.events(&raw_event) {
                debug!(event = "session.dispatch", session_id = %self.id, kind = parsed.kind());
                self.state.apply(parsed, renderer);
            }
        }
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(event = "session.transition", session_id = %self.id, from = ?self.phase, to = ?next);
        self.phase = next;
    }

    fn finish(
        mut self,
        outcome: Result<(), SessionFailure>,
        renderer: &mut dyn Renderer,
        counter: &mut WordCounter,
    ) -> SessionReport {
        let tail = self.framer.take_remainder();
        if !tail.is_empty() {
            debug!(event = "session.discarded_tail", session_id = %self.id, tail_len = tail.len() as u64);
        }

        let failure = outcome.err();
        match &failure {
            None => self.transition(SessionPhase::Completed),
            Some(failure) => {
                warn!(event = "session.failed", session_id = %self.id, error = %failure);
                renderer.report_error(&failure.to_string());
                self.transition(SessionPhase::Failed);
            }
        }

        self.state.set_active(false);
        let (text, saw_done, upstream_error, events) = self.state.into_parts();
        let words_added = finalize(renderer, counter, &text);
        info!(
            event = "session.finalized",
            session_id = %self.id,
            phase = ?self.phase,
            words_added = words_added as u64,
            saw_done,
            upstream_error = upstream_error.is_some()
        );

        SessionReport {
            session_id: self.id,
            phase: self.phase,
            text,
            words_added,
            events,
            skipped_payloads: self.dispatcher.skipped(),
            saw_done,
            upstream_error,
            failure,
        }
    }
}

async fn read_next(
    body: &mut ByteStream,
    read_timeout: Option<Duration>,
) -> Result<Option<bytes::Bytes>, SessionFailure> {
    let next = match read_timeout {
        Some(after) => tokio::time::timeout(after, body.next())
            .await
            .map_err(|_| SessionFailure::Timeout { after })?,
        None => body.next().await,
    };
    next.transpose().map_err(SessionFailure::from)
}

/// Shared end of every exchange: commit the response's words to the running
/// counter, then let the renderer reset its UI.
pub(crate) fn finalize(
    renderer: &mut dyn Renderer,
    counter: &mut WordCounter,
    text: &str,
) -> usize {
    let words_added = counter.commit(text);
    renderer.finalize(words_added);
    words_added
}
