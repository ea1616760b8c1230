//! HTTP client construction for the analysis backend.

use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// Applies the exchange-level timeout and proxy. The streaming loop relies
/// on this timeout to bound a hung transport.
pub fn build_http_client(options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_http_client() {
        let options = TransportOptions::new("https://api.example.com".to_string())
            .with_timeout(Duration::from_secs(30));

        let client = build_http_client(&options);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let options = TransportOptions::new("https://api.example.com".to_string())
            .with_proxy("http://proxy.example.com:8080".to_string());

        let client = build_http_client(&options);
        assert!(client.is_ok());
    }
}
