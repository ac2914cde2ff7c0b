/// Text used when an upstream `error` event carries no message.
pub const UNKNOWN_UPSTREAM_ERROR: &str = "unknown upstream error";

/// One logical event of the response stream.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental fragment of the generated response.
    Token { chunk: String },
    /// Upstream finished generating. Informational only.
    Done,
    /// Upstream reported a failure; no further tokens are expected.
    Error {
        #[serde(rename = "error")]
        message: String,
    },
}

impl StreamEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Token { .. } => "token",
            StreamEvent::Done => "done",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Decodes one JSON payload.
    ///
    /// Returns `Ok(None)` for well-formed payloads whose `type` is not known,
    /// so newer servers can add event kinds without breaking older clients.
    pub fn from_json(payload: &str) -> Result<Option<Self>, serde_json::Error> {
        let wire: WireEvent = serde_json::from_str(payload)?;
        Ok(wire.into_event())
    }
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireEvent {
    Token {
        #[serde(default)]
        chunk: Option<String>,
    },
    Done,
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    fn into_event(self) -> Option<StreamEvent> {
        match self {
            WireEvent::Token { chunk } => Some(StreamEvent::Token {
                chunk: chunk.unwrap_or_default(),
            }),
            WireEvent::Done => Some(StreamEvent::Done),
            WireEvent::Error { error, message } => Some(StreamEvent::Error {
                message: error
                    .or(message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_UPSTREAM_ERROR.to_string()),
            }),
            WireEvent::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_chunk_defaults_to_empty() {
        let event = StreamEvent::from_json(r#"{"type":"token"}"#).expect("parse");
        assert_eq!(
            event,
            Some(StreamEvent::Token {
                chunk: String::new()
            })
        );
        let event = StreamEvent::from_json(r#"{"type":"token","chunk":null}"#).expect("parse");
        assert_eq!(
            event,
            Some(StreamEvent::Token {
                chunk: String::new()
            })
        );
    }

    #[test]
    fn done_ignores_extra_fields() {
        let event = StreamEvent::from_json(r#"{"type":"done","elapsed_ms":12}"#).expect("parse");
        assert_eq!(event, Some(StreamEvent::Done));
    }

    #[test]
    fn error_reads_the_error_field_then_message() {
        let event = StreamEvent::from_json(r#"{"type":"error","error":"Backend error 502"}"#)
            .expect("parse");
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: "Backend error 502".into()
            })
        );
        let event =
            StreamEvent::from_json(r#"{"type":"error","message":"overloaded"}"#).expect("parse");
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: "overloaded".into()
            })
        );
        let event = StreamEvent::from_json(r#"{"type":"error"}"#).expect("parse");
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: UNKNOWN_UPSTREAM_ERROR.into()
            })
        );
    }

    #[test]
    fn unknown_type_is_accepted_but_yields_nothing() {
        let event = StreamEvent::from_json(r#"{"type":"usage","tokens":40}"#).expect("parse");
        assert_eq!(event, None);
    }

    #[test]
    fn missing_type_is_a_parse_error() {
        assert!(StreamEvent::from_json(r#"{"chunk":"x"}"#).is_err());
        assert!(StreamEvent::from_json("[DONE]").is_err());
    }

    #[test]
    fn serializes_with_the_wire_field_names() {
        let json = serde_json::to_value(StreamEvent::Error {
            message: "boom".into(),
        })
        .expect("serialize");
        assert_eq!(json, serde_json::json!({"type":"error","error":"boom"}));
    }
}
