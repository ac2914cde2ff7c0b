use std::char::REPLACEMENT_CHARACTER;

/// Incremental UTF-8 decoder for a byte stream delivered in arbitrary pieces.
///
/// A chunk that ends inside a multi-byte character keeps the unfinished
/// bytes and prefixes them onto the next call. Invalid sequences become
/// U+FFFD in place; decoding never fails.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk`, carrying an incomplete trailing character over to the
    /// next call.
    ///
    /// With `final_call` set, held bytes that never completed are flushed as a
    /// single replacement character instead of being kept.
    pub fn decode(&mut self, chunk: &[u8], final_call: bool) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&rest[..valid_len]) {
                        out.push_str(valid);
                    }
                    match err.error_len() {
                        Some(invalid_len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &rest[valid_len + invalid_len..];
                        }
                        None => {
                            // Truncated sequence at the end of the input.
                            if final_call {
                                out.push(REPLACEMENT_CHARACTER);
                            } else {
                                self.pending = rest[valid_len..].to_vec();
                            }
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Returns true while bytes of an unfinished character are held.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_character_split_across_chunks() {
        let bytes = "olá".as_bytes();
        let mut decoder = ChunkDecoder::new();
        let first = decoder.decode(&bytes[..3], false);
        assert_eq!(first, "ol");
        assert!(decoder.has_pending());
        let second = decoder.decode(&bytes[3..], false);
        assert_eq!(second, "á");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn four_byte_character_fed_one_byte_at_a_time() {
        let bytes = "a🦀b".as_bytes();
        let mut decoder = ChunkDecoder::new();
        let mut out = String::new();
        for byte in bytes {
            let piece = decoder.decode(std::slice::from_ref(byte), false);
            assert!(!piece.contains(REPLACEMENT_CHARACTER));
            out.push_str(&piece);
        }
        assert_eq!(out, "a🦀b");
    }

    #[test]
    fn invalid_byte_is_replaced_and_decoding_continues() {
        let mut decoder = ChunkDecoder::new();
        let out = decoder.decode(b"ab\xffcd", false);
        assert_eq!(out, "ab\u{FFFD}cd");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn final_call_flushes_unfinished_bytes() {
        let euro = "€".as_bytes();
        let mut decoder = ChunkDecoder::new();
        assert_eq!(decoder.decode(&euro[..2], false), "");
        assert_eq!(decoder.decode(&[], true), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn final_call_with_complete_input_adds_nothing() {
        let mut decoder = ChunkDecoder::new();
        assert_eq!(decoder.decode("done".as_bytes(), true), "done");
    }
}
