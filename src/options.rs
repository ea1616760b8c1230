//! Transport configuration for the analysis backend.

use std::collections::HashMap;
use std::time::Duration;

/// A secret string type for sensitive data like bearer tokens.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Transport options for reaching the analysis backend.
///
/// The timeout bounds the whole HTTP exchange, including a hung streaming
/// read; the streaming loop itself enforces no timeout of its own.
///
/// # Example
/// ```rust
/// use matchstream::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new("https://api.example.com".to_string())
///     .with_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Base URL for API endpoints
    pub base_url: String,

    /// Request timeout (applies to the full exchange)
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    /// Create new transport options pointed at a base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            timeout: None,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
