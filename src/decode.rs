//! Incremental UTF-8 decoding of raw transport chunks.
//!
//! Chunk boundaries are byte boundaries, so a multi-byte character can be
//! split across two chunks. The decoder keeps the incomplete trailing
//! sequence of each chunk and prepends it to the next one, so callers always
//! receive whole characters.

/// Stateful UTF-8 decoder for a stream of byte chunks.
///
/// One decoder belongs to exactly one stream session; state is never shared
/// across sessions.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Incomplete trailing UTF-8 sequence held over from the previous chunk
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a new decoder with no pending state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning the text it completes.
    ///
    /// An incomplete trailing sequence is held back for the next call.
    /// Invalid interior bytes are replaced with U+FFFD immediately.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut out = String::with_capacity(buf.len());
        let mut rest = buf.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        // Invalid sequence in the middle of the chunk
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        // Truncated sequence at the end: may be completed
                        // by the next chunk
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush the decoder at end of stream.
    ///
    /// A dangling partial character becomes U+FFFD rather than being
    /// silently dropped.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}
