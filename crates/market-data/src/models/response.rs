use std::collections::HashMap;

use serde_json::Value;

use crate::errors::BrokerApiError;

/// What went wrong with a failed request, as an explicit tag rather than
/// control flow. Business failures are the only kind the retry controller
/// must not see again: the provider answered authoritatively.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// Timeout or connection failure before an HTTP status was received.
    Transport,
    /// A non-200 HTTP status (including a repeated 401 after refresh).
    Http,
    /// HTTP 200 but the provider's embedded success discriminant signalled
    /// a business-level failure.
    Business,
    /// HTTP 200 with a body that was not valid JSON.
    InvalidFormat,
}

/// Uniform result envelope for one executed request.
///
/// Every provider's success/error shape is normalized into this one form.
/// Invariant: `success == false` implies `message` and `failure` are
/// populated (`code` is absent only for unparseable bodies);
/// `success == true` implies all three are `None`.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    /// Whether the call succeeded at the business level
    pub success: bool,
    /// Parsed response payload; `Null` when no body was received
    pub data: Value,
    /// Normalized failure code
    pub code: Option<String>,
    /// Failure detail
    pub message: Option<String>,
    /// Response headers, lower-cased, for continuation-marker extraction
    pub headers: HashMap<String, String>,
    /// Failure classification tag
    pub failure: Option<FailureKind>,
}

impl ApiResponse {
    pub fn success(data: Value, headers: HashMap<String, String>) -> Self {
        Self {
            success: true,
            data,
            code: None,
            message: None,
            headers,
            failure: None,
        }
    }

    pub fn failure(
        kind: FailureKind,
        code: Option<String>,
        message: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            success: false,
            data: Value::Null,
            code,
            message: Some(message.into()),
            headers,
            failure: Some(kind),
        }
    }

    /// Attach the parsed payload to a failure envelope, for callers that
    /// want to inspect the provider's raw error body.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Converts a retryable failure envelope into the error the retry
    /// controller acts on. Business failures and successes return `None`:
    /// they are final answers.
    pub fn transient_error(&self) -> Option<BrokerApiError> {
        match self.failure {
            Some(FailureKind::Transport) | Some(FailureKind::Http) | Some(FailureKind::InvalidFormat) => {
                Some(BrokerApiError::Transient {
                    code: self
                        .code
                        .clone()
                        .unwrap_or_else(|| "INVALID_FORMAT".to_string()),
                    message: self
                        .message
                        .clone()
                        .unwrap_or_else(|| "request failed".to_string()),
                })
            }
            Some(FailureKind::Business) | None => None,
        }
    }
}
