//! Incremental decoding of the optimizer byte stream
//!
//! Fragments arrive on arbitrary byte boundaries, so a multi-byte character may
//! be split between two fragments. The server terminates a cleanly completed
//! stream with [`COMPLETION_MARKER`]; a stream that ends without it was cut
//! short.

use serde::{Deserialize, Serialize};

/// Written after the last fragment of a cleanly completed stream
pub const COMPLETION_MARKER: &str = "\u{1e}[[prompthub:end]]";

const MARKER_START: char = '\u{1e}';

/// UTF-8 decoder that carries incomplete sequences over to the next fragment
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any carried-over bytes) as possible.
    /// Invalid sequences become U+FFFD; an incomplete trailing sequence is
    /// kept for the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        None => {
                            self.pending.drain(..valid_up_to);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                    }
                }
            }
        }
    }

    /// True when an incomplete sequence is waiting for more bytes
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flush at end of stream; a dangling sequence becomes U+FFFD
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(char::REPLACEMENT_CHARACTER.to_string())
    }
}

/// How a stream ended, from the consumer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    /// Completion marker received at the very end
    Completed,
    /// Stream ended without the completion marker
    Truncated,
}

/// Accumulates decoded text, withholding a possible completion marker from
/// the visible transcript
#[derive(Debug, Default)]
pub struct TranscriptBuilder {
    decoder: Utf8StreamDecoder,
    text: String,
    held: String,
}

impl TranscriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible text so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply one fragment; returns true when the visible text changed
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        let decoded = self.decoder.decode(bytes);
        if decoded.is_empty() {
            return false;
        }
        let before = self.text.len();
        self.held.push_str(&decoded);
        self.release_held();
        self.text.len() != before
    }

    /// Move everything out of `held` that cannot be the start of the marker
    fn release_held(&mut self) {
        loop {
            match self.held.find(MARKER_START) {
                None => {
                    self.text.push_str(&self.held);
                    self.held.clear();
                    return;
                }
                Some(0) => {
                    if COMPLETION_MARKER.starts_with(self.held.as_str()) {
                        return;
                    }
                    let len = MARKER_START.len_utf8();
                    self.text.push_str(&self.held[..len]);
                    self.held.drain(..len);
                }
                Some(idx) => {
                    self.text.push_str(&self.held[..idx]);
                    self.held.drain(..idx);
                }
            }
        }
    }

    /// End of stream: final text and whether the stream completed cleanly
    pub fn finish(mut self) -> (String, StreamOutcome) {
        let dangling = self.decoder.finish();
        if dangling.is_none() && self.held == COMPLETION_MARKER {
            return (self.text, StreamOutcome::Completed);
        }
        self.text.push_str(&self.held);
        if let Some(rest) = dangling {
            self.text.push_str(&rest);
        }
        (self.text, StreamOutcome::Truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_in_chunks(bytes: &[u8], chunk: usize) -> (String, StreamOutcome) {
        let mut builder = TranscriptBuilder::new();
        for piece in bytes.chunks(chunk) {
            builder.push(piece);
        }
        builder.finish()
    }

    #[test]
    fn test_split_multibyte_character() {
        let mut decoder = Utf8StreamDecoder::new();
        let bytes = "你".as_bytes();
        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&bytes[1..2]), "");
        assert_eq!(decoder.decode(&bytes[2..]), "你");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_any_chunking_yields_same_text() {
        let text = "héllo 你好 🌆 wörld";
        let mut body = text.as_bytes().to_vec();
        body.extend_from_slice(COMPLETION_MARKER.as_bytes());

        for chunk in 1..=body.len() {
            let (decoded, outcome) = feed_in_chunks(&body, chunk);
            assert_eq!(decoded, text, "chunk size {chunk}");
            assert_eq!(outcome, StreamOutcome::Completed, "chunk size {chunk}");
        }
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{fffd}b");
    }

    #[test]
    fn test_missing_marker_is_truncated() {
        let (text, outcome) = feed_in_chunks("partial answer".as_bytes(), 4);
        assert_eq!(text, "partial answer");
        assert_eq!(outcome, StreamOutcome::Truncated);
    }

    #[test]
    fn test_marker_prefix_is_withheld_until_resolved() {
        let mut builder = TranscriptBuilder::new();
        assert!(builder.push(b"abc"));
        assert!(!builder.push("\u{1e}[[prompt".as_bytes()));
        assert_eq!(builder.text(), "abc");

        // Not the marker after all: the withheld text becomes visible
        assert!(builder.push(b"x"));
        assert_eq!(builder.text(), "abc\u{1e}[[promptx");
        let (_, outcome) = builder.finish();
        assert_eq!(outcome, StreamOutcome::Truncated);
    }

    #[test]
    fn test_marker_in_the_middle_is_text() {
        let body = format!("a{COMPLETION_MARKER}b");
        let (text, outcome) = feed_in_chunks(body.as_bytes(), 3);
        assert_eq!(text, body);
        assert_eq!(outcome, StreamOutcome::Truncated);
    }

    #[test]
    fn test_dangling_sequence_marks_truncation() {
        let bytes = "好".as_bytes();
        let mut builder = TranscriptBuilder::new();
        builder.push(b"ok");
        builder.push(&bytes[..2]);
        let (text, outcome) = builder.finish();
        assert_eq!(text, "ok\u{fffd}");
        assert_eq!(outcome, StreamOutcome::Truncated);
    }
}
