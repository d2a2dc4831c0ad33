//! Provider protocol trait definition.
//!
//! Each upstream brokerage differs in its token endpoint, auth header
//! layout, and the success discriminant embedded in its payloads. Those
//! differences are isolated behind [`ProviderProtocol`] so the credential
//! manager and request executor stay provider-agnostic.

use serde_json::Value;

use crate::credential::AccessCredential;
use crate::errors::BrokerApiError;
use crate::models::ApiRequest;

/// Business-level verdict extracted from an HTTP 200 payload.
///
/// Providers signal failures inside successful HTTP responses; the HTTP
/// status alone says nothing about whether the operation worked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusinessStatus {
    Success,
    Failure { code: String, message: String },
}

/// Everything provider-specific about authentication and response shapes.
///
/// Implement this to add a provider. The credential manager drives
/// [`issue_request`](Self::issue_request) /
/// [`parse_issue_response`](Self::parse_issue_response) through the shared
/// transport; the executor uses [`auth_headers`](Self::auth_headers) and
/// [`business_status`](Self::business_status) on every call.
pub trait ProviderProtocol: Send + Sync {
    /// Unique identifier, e.g. "KIWOOM" or "KIS". Used for logging and as
    /// the credential store key.
    fn id(&self) -> &'static str;

    /// Scheme, host, and port every endpoint path is joined to.
    fn base_url(&self) -> &str;

    /// The token issuance call, ready to send. No credential headers are
    /// attached: issuance authenticates with the app key pair in the body.
    fn issue_request(&self) -> ApiRequest;

    /// Extracts a credential from a 200-status issuance payload, or a
    /// [`BrokerApiError::CredentialIssuance`] describing why it is
    /// unusable.
    fn parse_issue_response(&self, payload: &Value) -> Result<AccessCredential, BrokerApiError>;

    /// Headers attached to every authenticated request.
    fn auth_headers(&self, credential: &AccessCredential) -> Vec<(String, String)>;

    /// Reads the provider's embedded success discriminant.
    fn business_status(&self, payload: &Value) -> BusinessStatus;
}
