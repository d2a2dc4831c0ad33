use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, warn};
use serde_json::Value;

use crate::credential::CredentialManager;
use crate::errors::BrokerApiError;
use crate::models::{ApiRequest, ApiResponse, FailureKind};
use crate::provider::{BusinessStatus, ProviderProtocol};

use super::{truncate_body, HttpTransport, TransportError};

/// How much of a non-200 response body ends up in the failure message.
const BODY_SNIPPET_BYTES: usize = 200;

/// Executes one logical call against a provider and folds every outcome
/// into the uniform [`ApiResponse`] envelope.
///
/// Credential handling: the current credential is read from the
/// [`CredentialManager`] and its headers are rebuilt per attempt. A 401
/// triggers exactly one refresh and one re-send; a second 401 is returned
/// as a failure envelope rather than looping. Credential issuance failures
/// propagate as errors since nothing the executor does can recover them.
pub struct RequestExecutor {
    protocol: Arc<dyn ProviderProtocol>,
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<CredentialManager>,
}

impl RequestExecutor {
    pub fn new(
        protocol: Arc<dyn ProviderProtocol>,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<CredentialManager>,
    ) -> Self {
        Self {
            protocol,
            transport,
            credentials,
        }
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, BrokerApiError> {
        let mut credential = self.credentials.get().await?;
        let mut refreshed = false;

        loop {
            let attempt = request.with_auth_headers(self.protocol.auth_headers(&credential));
            debug!(
                "{} request: {} {}",
                self.protocol.id(),
                attempt.method,
                attempt.path
            );

            let raw = match self.transport.send(self.protocol.base_url(), &attempt).await {
                Ok(raw) => raw,
                Err(TransportError::Timeout) => {
                    error!("{} request timed out: {}", self.protocol.id(), request.path);
                    return Ok(ApiResponse::failure(
                        FailureKind::Transport,
                        Some("TIMEOUT".to_string()),
                        format!("request timed out: {}", request.path),
                        HashMap::new(),
                    ));
                }
                Err(TransportError::Connect(message)) => {
                    error!("{} connection failed: {message}", self.protocol.id());
                    return Ok(ApiResponse::failure(
                        FailureKind::Transport,
                        Some("CONNECTION_ERROR".to_string()),
                        message,
                        HashMap::new(),
                    ));
                }
                Err(TransportError::Other(message)) => {
                    error!("{} request failed: {message}", self.protocol.id());
                    return Ok(ApiResponse::failure(
                        FailureKind::Transport,
                        None,
                        message,
                        HashMap::new(),
                    ));
                }
            };

            // Kept for continuation-marker extraction by pagination callers.
            let headers: HashMap<String, String> = raw
                .headers
                .iter()
                .map(|(name, value)| (name.to_lowercase(), value.clone()))
                .collect();

            if raw.status == 401 && !refreshed {
                warn!(
                    "{} returned 401, refreshing credential and retrying once",
                    self.protocol.id()
                );
                credential = self.credentials.refresh().await?;
                refreshed = true;
                continue;
            }

            if raw.status != 200 {
                error!(
                    "{} request failed with status {}",
                    self.protocol.id(),
                    raw.status
                );
                return Ok(ApiResponse::failure(
                    FailureKind::Http,
                    Some(raw.status.to_string()),
                    truncate_body(&raw.body, BODY_SNIPPET_BYTES),
                    headers,
                ));
            }

            let payload: Value = match serde_json::from_str(&raw.body) {
                Ok(payload) => payload,
                Err(parse_error) => {
                    error!(
                        "{} response is not valid JSON: {parse_error}",
                        self.protocol.id()
                    );
                    return Ok(ApiResponse::failure(
                        FailureKind::InvalidFormat,
                        None,
                        "invalid response format",
                        headers,
                    ));
                }
            };

            // Business-level success lives in the payload, not the status.
            return Ok(match self.protocol.business_status(&payload) {
                BusinessStatus::Success => ApiResponse::success(payload, headers),
                BusinessStatus::Failure { code, message } => {
                    warn!(
                        "{} business error: code {code} - {message}",
                        self.protocol.id()
                    );
                    ApiResponse::failure(FailureKind::Business, Some(code), message, headers)
                        .with_data(payload)
                }
            });
        }
    }
}
