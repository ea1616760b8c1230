//! # matchstream - Streaming client for the match-analysis chat API
//!
//! A small, pragmatic Rust library for consuming the analytics backend's
//! chat endpoint, which streams AI-generated match analysis token-by-token
//! over `text/event-stream`-style protocol lines.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental UTF-8 decoding, safe across chunk boundaries
//! - Line reassembly for protocol frames split between chunks
//! - Ordered, non-overlapping delivery callbacks per session
//! - Idempotent cancellation handle returned at session start
//!
//! ## Architecture
//!
//! One call to [`StreamClient::stream_chat`] is one session: a single POST
//! whose response body is pulled chunk by chunk through three stages.
//! Each chunk passes through UTF-8 decode ([`decode::Utf8Decoder`]), line
//! reassembly ([`sse::LineReassembler`]), and frame classification
//! ([`sse::classify_line`]), with each accepted payload handed to the
//! caller's [`StreamHandler`] in stream order. The terminal `data: [DONE]`
//! line ends the session immediately; a stream that ends without it has its
//! remainder flushed as one final best-effort frame.
//!
//! ## Example
//! ```no_run
//! use matchstream::{ChatMessage, ChatRequest, StreamClient, StreamHandler, TransportOptions};
//!
//! struct Collect(String);
//!
//! impl StreamHandler for Collect {
//!     fn on_data(&mut self, text: &str) {
//!         self.0.push_str(text);
//!     }
//!     fn on_complete(&mut self) {
//!         println!("{}", self.0);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StreamClient::new(
//!         TransportOptions::new("https://api.example.com".to_string()),
//!     )?;
//!
//!     let request = ChatRequest::new(vec![ChatMessage::user(
//!         "Who is likely to win the late kickoff?",
//!     )]);
//!
//!     let handle = client.stream_chat(request, Collect(String::new())).await?;
//!     let _ = handle; // call handle.cancel() to stop early
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod credentials;
pub mod decode;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod sse;

// Re-exports for convenience
pub use client::{ClientError, StreamClient};
pub use credentials::{CredentialStore, TokenScope};
pub use model::{ChatMessage, ChatRequest, Role};
pub use options::{SecretString, TransportOptions};
pub use session::{StreamHandle, StreamHandler};
