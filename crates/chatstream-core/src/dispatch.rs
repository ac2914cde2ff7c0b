use tracing::{debug, trace};

use crate::event::StreamEvent;
use crate::framer::EventFramer;
use crate::render::{Renderer, count_words};

/// Turns framed events into typed `StreamEvent`s.
///
/// Malformed payloads are dropped and counted, never surfaced as errors.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    parsed: u64,
    skipped: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single payload line.
    ///
    /// Returns `None` for blank payloads, payloads that are not a valid event
    /// envelope, and envelopes of an unknown `type`.
    pub fn parse(&mut self, payload: &str) -> Option<StreamEvent> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        match StreamEvent::from_json(payload) {
            Ok(Some(event)) => {
                self.parsed += 1;
                Some(event)
            }
            Ok(None) => {
                trace!(event = "dispatch.unknown_type", payload_len = payload.len() as u64);
                None
            }
            Err(err) => {
                self.skipped += 1;
                trace!(event = "dispatch.malformed_payload", error = %err, payload_len = payload.len() as u64);
                None
            }
        }
    }

    /// Parses every `data: ` line of one raw event, each as its own event.
    pub fn events(&mut self, raw_event: &str) -> Vec<StreamEvent> {
        EventFramer::data_lines(raw_event)
            .filter_map(|line| self.parse(line))
            .collect()
    }

    /// Number of payloads that produced an event.
    pub fn parsed(&self) -> u64 {
        self.parsed
    }

    /// Number of payloads dropped because they did not parse.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// What applying one event did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Text grew and the renderer was redrawn.
    Rendered,
    /// Upstream signalled completion.
    Done,
    /// Upstream reported an error; later tokens are ignored.
    UpstreamError,
    /// The event arrived after an upstream error and was dropped.
    Ignored,
}

/// Mutable accumulation of one session.
#[derive(Debug, Default)]
pub struct SessionState {
    full_text: String,
    active: bool,
    saw_done: bool,
    upstream_error: Option<String>,
    applied: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event, invoking the matching renderer callback.
    pub fn apply(&mut self, event: StreamEvent, renderer: &mut dyn Renderer) -> Applied {
        if self.upstream_error.is_some() {
            debug!(event = "dispatch.after_upstream_error", kind = event.kind());
            return Applied::Ignored;
        }
        self.applied += 1;
        match event {
            StreamEvent::Token { chunk } => {
                self.full_text.push_str(&chunk);
                renderer.render(&self.full_text);
                Applied::Rendered
            }
            StreamEvent::Done => {
                self.saw_done = true;
                Applied::Done
            }
            StreamEvent::Error { message } => {
                renderer.report_error(&message);
                self.upstream_error = Some(message);
                Applied::UpstreamError
            }
        }
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// True between the start of a session and its finalization.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The response accumulated so far.
    pub fn text(&self) -> &str {
        &self.full_text
    }

    /// Words that finalization will commit to the running counter.
    pub fn pending_words(&self) -> usize {
        count_words(&self.full_text)
    }

    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    pub fn upstream_error(&self) -> Option<&str> {
        self.upstream_error.as_deref()
    }

    /// Number of events that changed this state.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub(crate) fn into_parts(self) -> (String, bool, Option<String>, u64) {
        (self.full_text, self.saw_done, self.upstream_error, self.applied)
    }
}
