/// Blank line separating two events.
pub const EVENT_SEPARATOR: &str = "\n\n";
/// Prefix of the lines that carry a payload inside an event.
pub const DATA_PREFIX: &str = "data: ";

/// Extracts complete events from decoded text that arrives in pieces.
///
/// Text after the last separator stays buffered until a later `push`
/// completes it.
#[derive(Debug, Default)]
pub struct EventFramer {
    buffer: String,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` and returns every event completed by it, in order.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(idx) = self.buffer[consumed..].find(EVENT_SEPARATOR) {
            let end = consumed + idx;
            events.push(self.buffer[consumed..end].to_string());
            consumed = end + EVENT_SEPARATOR.len();
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        events
    }

    /// Payloads of the `data: ` lines of one raw event, in encounter order.
    ///
    /// Each line is its own payload; lines are never concatenated.
    pub fn data_lines(raw_event: &str) -> impl Iterator<Item = &str> {
        raw_event
            .split('\n')
            .filter_map(|line| line.strip_prefix(DATA_PREFIX))
    }

    /// The unconsumed tail (a partial next event, or empty).
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    /// Removes and returns the unconsumed tail.
    pub fn take_remainder(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "data: {\"type\":\"token\",\"chunk\":\"ab\"}\n\n\
                          : keep-alive\ndata: {\"type\":\"token\",\"chunk\":\"cd\"}\n\n\
                          \n\n\
                          data: {\"type\":\"done\"}\n\n\
                          data: partial";

    fn frame_all(pieces: &[&str]) -> (Vec<String>, String) {
        let mut framer = EventFramer::new();
        let mut events = Vec::new();
        for piece in pieces {
            events.extend(framer.push(piece));
        }
        (events, framer.remainder().to_string())
    }

    #[test]
    fn single_push_yields_every_complete_event() {
        let (events, rest) = frame_all(&[STREAM]);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], "data: {\"type\":\"token\",\"chunk\":\"ab\"}");
        assert_eq!(events[2], "");
        assert_eq!(rest, "data: partial");
    }

    #[test]
    fn incomplete_event_yields_nothing_until_completed() {
        let mut framer = EventFramer::new();
        assert!(framer.push("data: {\"typ").is_empty());
        assert!(framer.push("e\":\"done\"}\n").is_empty());
        assert_eq!(framer.push("\n"), vec!["data: {\"type\":\"done\"}".to_string()]);
        assert_eq!(framer.remainder(), "");
    }

    #[test]
    fn framing_is_independent_of_split_points() {
        let (expected, expected_rest) = frame_all(&[STREAM]);
        let boundaries: Vec<usize> = STREAM.char_indices().map(|(i, _)| i).collect();
        for &a in &boundaries {
            for &b in boundaries.iter().filter(|&&b| b >= a) {
                let (events, rest) = frame_all(&[&STREAM[..a], &STREAM[a..b], &STREAM[b..]]);
                assert_eq!(events, expected, "split at {a}/{b}");
                assert_eq!(rest, expected_rest, "split at {a}/{b}");
            }
        }
    }

    #[test]
    fn byte_splits_through_the_decoder_frame_identically() {
        use crate::decoder::ChunkDecoder;

        let stream = "data: {\"type\":\"token\",\"chunk\":\"olá \"}\n\n\
                      data: {\"type\":\"token\",\"chunk\":\"🦀 ção\"}\n\n\
                      data: {\"type\":\"done\"}\n\n";
        let bytes = stream.as_bytes();
        let frame_bytes = |pieces: &[&[u8]]| {
            let mut decoder = ChunkDecoder::new();
            let mut framer = EventFramer::new();
            let mut events = Vec::new();
            for (i, piece) in pieces.iter().enumerate() {
                let text = decoder.decode(piece, i + 1 == pieces.len());
                events.extend(framer.push(&text));
            }
            (events, framer.remainder().to_string())
        };

        let expected = frame_bytes(&[bytes][..]);
        assert_eq!(expected.0.len(), 3);
        for a in 0..=bytes.len() {
            for b in a..=bytes.len() {
                let split = frame_bytes(&[&bytes[..a], &bytes[a..b], &bytes[b..]][..]);
                assert_eq!(split, expected, "byte split at {a}/{b}");
            }
        }
    }

    #[test]
    fn data_lines_skip_other_fields_and_keep_order() {
        let raw = "event: message\ndata: one\nid: 7\ndata: two\ndata:three";
        let lines: Vec<&str> = EventFramer::data_lines(raw).collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn take_remainder_empties_the_buffer() {
        let mut framer = EventFramer::new();
        framer.push("data: tail");
        assert_eq!(framer.take_remainder(), "data: tail");
        assert_eq!(framer.remainder(), "");
    }
}
