//! Server-Sent Events (SSE) line reassembly and classification.
//!
//! The analysis backend streams newline-separated protocol lines:
//!
//! ```text
//! data: first text delta
//!
//! data: second text delta
//!
//! data: [DONE]
//! ```
//!
//! Payloads are plain text deltas, not JSON. Lines without the `data: `
//! prefix (comments, keep-alives) are ignored.

/// Prefix marking a protocol data line.
const DATA_PREFIX: &str = "data: ";

/// Sentinel payload signaling end-of-stream at the protocol level.
const DONE_MARKER: &str = "[DONE]";

/// Reassembles decoded text fragments into complete lines.
///
/// Fragments arrive at arbitrary chunk boundaries, so the final element of
/// any split may be an incomplete line; it is held back until more text
/// arrives or the stream ends.
#[derive(Debug, Default)]
pub struct LineReassembler {
    /// Trailing text for which no terminating newline has been seen yet
    remainder: String,
}

impl LineReassembler {
    /// Create a reassembler with an empty remainder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text fragment, returning all complete lines in order.
    ///
    /// Lines are trimmed; the unterminated tail becomes the new remainder.
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        self.remainder.push_str(fragment);

        let mut lines = Vec::new();
        while let Some(pos) = self.remainder.find('\n') {
            lines.push(self.remainder[..pos].trim().to_string());
            self.remainder.drain(..=pos);
        }
        lines
    }

    /// Flush the remainder at end of stream.
    ///
    /// Returns the held-over text as one final best-effort line, or `None`
    /// if nothing but whitespace is pending.
    pub fn flush(&mut self) -> Option<String> {
        let remainder = std::mem::take(&mut self.remainder);
        let line = remainder.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

/// Classification of one reassembled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text delta to deliver to the caller
    Data(String),
    /// The terminal sentinel; processing stops immediately
    Done,
    /// Blank, comment, or otherwise non-protocol line
    Ignore,
}

/// Classify one trimmed line from the stream.
///
/// An empty payload after the prefix (`"data: "` with nothing following) is
/// ignored, never delivered as an empty delta.
pub fn classify_line(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() {
        return Frame::Ignore;
    }
    let Some(payload) = parse_sse_line(line) else {
        return Frame::Ignore;
    };
    if is_done_marker(payload) {
        return Frame::Done;
    }
    if payload.is_empty() {
        return Frame::Ignore;
    }
    Frame::Data(payload.to_string())
}

/// Parse an SSE line to extract the data portion.
///
/// SSE lines are in the format: `data: <content>`
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(|s| s.trim())
}

/// Check if an SSE data payload indicates the stream is done.
pub fn is_done_marker(payload: &str) -> bool {
    payload == DONE_MARKER
}
