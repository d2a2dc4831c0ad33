//! Scripted transport and payload helpers shared by the crate's tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Local};
use serde_json::{json, Value};

use crate::credential::format_expiry;
use crate::models::ApiRequest;
use crate::transport::{HttpTransport, RawResponse, TransportError};

/// A transport that replays scripted outcomes in order and records every
/// request it was asked to send. Running out of script is a test bug and
/// panics with the offending request.
pub(crate) struct StubTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    calls: Mutex<Vec<(String, ApiRequest)>>,
}

impl StubTransport {
    pub(crate) fn new(responses: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(base_url, request)` pair sent so far.
    pub(crate) fn calls(&self) -> Vec<(String, ApiRequest)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// How many requests hit the given token issuance path.
    pub(crate) fn issuance_count(&self, token_path: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(_, request)| request.path == token_path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(
        &self,
        base_url: &str,
        request: &ApiRequest,
    ) -> Result<RawResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((base_url.to_string(), request.clone()));
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                panic!(
                    "unscripted request: {} {}{}",
                    request.method, base_url, request.path
                )
            })
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> RawResponse {
    RawResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    }
}

pub(crate) fn json_response_with_headers(
    status: u16,
    body: Value,
    headers: &[(&str, &str)],
) -> RawResponse {
    let mut response = json_response(status, body);
    response.headers.extend(
        headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string())),
    );
    response
}

/// A successful Kiwoom token payload expiring `hours_from_now` out.
pub(crate) fn kiwoom_token_body(token: &str, hours_from_now: i64) -> Value {
    json!({
        "return_code": 0,
        "return_msg": "정상처리",
        "token": token,
        "token_type": "bearer",
        "expires_dt": format_expiry(Local::now().naive_local() + Duration::hours(hours_from_now)),
    })
}

/// A successful KIS token payload with the given lifetime in seconds.
pub(crate) fn kis_token_body(token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}
