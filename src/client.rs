//! Client handle and error types for the analysis backend.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::credentials::{resolve_bearer_token, CredentialStore};
use crate::http::{add_extra_headers, build_http_client};
use crate::model::ChatRequest;
use crate::options::TransportOptions;
use crate::session::{self, StreamHandle, StreamHandler};

/// Relative path of the streaming chat endpoint.
const STREAM_CHAT_PATH: &str = "/api/stream/chat";

/// Errors that can occur during client operations.
///
/// Caller-initiated cancellation is not an error and has no variant here;
/// a cancelled session simply stops.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Client for the streaming analysis chat endpoint.
///
/// Cheap to construct once and reuse; each [`stream_chat`] call opens an
/// independent session with its own decode state, so sessions may run
/// concurrently.
///
/// [`stream_chat`]: StreamClient::stream_chat
///
/// # Example
/// ```no_run
/// use matchstream::client::StreamClient;
/// use matchstream::model::{ChatMessage, ChatRequest};
/// use matchstream::options::TransportOptions;
/// use matchstream::session::StreamHandler;
///
/// struct Printer;
///
/// impl StreamHandler for Printer {
///     fn on_data(&mut self, text: &str) {
///         print!("{text}");
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = StreamClient::new(
///         TransportOptions::new("https://api.example.com".to_string()),
///     )?;
///
///     let request = ChatRequest::new(vec![ChatMessage::user(
///         "Analyse tonight's derby for me",
///     )])
///     .with_deep_thinking(true);
///
///     let handle = client.stream_chat(request, Printer).await?;
///     // handle.cancel() would stop the stream early
///     let _ = handle;
///     Ok(())
/// }
/// ```
pub struct StreamClient {
    http: reqwest::Client,
    options: TransportOptions,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl StreamClient {
    /// Create a client from transport options.
    pub fn new(options: TransportOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self {
            http,
            options,
            credentials: None,
        })
    }

    /// Attach a credential store consulted once per session start.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Start one streaming chat session.
    ///
    /// Sends the request with `stream` forced to `true`, and once a success
    /// status arrives begins pulling the body on a background task,
    /// delivering frames to `handler` in order. Resolves with the
    /// cancellation handle as soon as streaming begins.
    ///
    /// Errors before streaming begins (request construction, connection,
    /// non-success status) are returned from this call *and* reported via
    /// `handler.on_error`; the session never starts. Errors after that are
    /// reported only via `handler.on_error`.
    pub async fn stream_chat<H: StreamHandler>(
        &self,
        request: ChatRequest,
        mut handler: H,
    ) -> Result<StreamHandle, ClientError> {
        match self.open_stream(request).await {
            Ok(response) => Ok(session::spawn(response.bytes_stream(), handler)),
            Err(err) => {
                handler.on_error(&err);
                Err(err)
            }
        }
    }

    /// Issue the POST and negotiate a streaming response.
    async fn open_stream(&self, mut request: ChatRequest) -> Result<reqwest::Response, ClientError> {
        request.stream = Some(true);

        let url = format!("{}{}", self.options.base_url, STREAM_CHAT_PATH);
        let mut req = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream");

        if let Some(store) = &self.credentials {
            if let Some(token) = resolve_bearer_token(store.as_ref()) {
                req = req.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
            }
        }

        req = add_extra_headers(req, &self.options.extra_headers);

        let response = req.json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected { status, body });
        }

        debug!(%status, "stream negotiated");
        Ok(response)
    }
}
