//! HTTP transport seam and the request executor built on top of it.
//!
//! [`HttpTransport`] is the only place the crate touches the network; the
//! production implementation wraps a [`reqwest::Client`] with a fixed
//! timeout. Everything above it (credential issuance, request execution,
//! pagination) is exercised against a scripted transport in tests.

mod executor;

pub use executor::RequestExecutor;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::models::ApiRequest;

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP response as received, before any normalization.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    /// Header names/values as sent by the server
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Transport-level failures, before an HTTP status was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Sends one resolved request and returns whatever came back.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, base_url: &str, request: &ApiRequest)
        -> Result<RawResponse, TransportError>;
}

/// Production transport: a shared `reqwest::Client` with the fixed timeout.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        base_url: &str,
        request: &ApiRequest,
    ) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(classify_error)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

/// Truncates a response body for logs and error messages, respecting UTF-8
/// boundaries (provider messages are frequently Korean text).
pub(crate) fn truncate_body(body: &str, max_bytes: usize) -> String {
    if body.len() <= max_bytes {
        return body.to_string();
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_body_unchanged() {
        assert_eq!(truncate_body("ok", 200), "ok");
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(300);
        let truncated = truncate_body(&body, 200);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_respects_utf8_boundaries() {
        // Each hangul syllable is 3 bytes; cutting at 4 must back up.
        let truncated = truncate_body("거래소", 4);
        assert_eq!(truncated, "거...");
    }
}
