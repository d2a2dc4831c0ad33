use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::BrokerApiError;
use crate::provider::ProviderProtocol;
use crate::transport::{truncate_body, HttpTransport};

use super::credential::AccessCredential;
use super::store::CredentialStore;

/// How close to expiry a credential may get before it is reissued.
pub const SAFETY_MARGIN_MINUTES: i64 = 10;

/// Issuance attempt budget.
const ISSUE_ATTEMPTS: u32 = 3;

/// Base delay between issuance attempts; grows linearly per attempt.
const ISSUE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-provider credential lifecycle: issue, load, validate, refresh.
///
/// The manager is the single in-process source of truth for its provider's
/// credential and the only writer to its store record. Construction either
/// adopts a fresh stored credential or issues a new one; it fails with
/// [`BrokerApiError::CredentialIssuance`] rather than produce a manager
/// with nothing usable. Refresh is serialized behind an exclusive lock so
/// no request can observe a credential mid-replacement.
pub struct CredentialManager {
    protocol: Arc<dyn ProviderProtocol>,
    transport: Arc<dyn HttpTransport>,
    store: CredentialStore,
    current: Mutex<AccessCredential>,
    safety_margin: chrono::Duration,
    max_attempts: u32,
    retry_delay: Duration,
}

impl CredentialManager {
    pub async fn new(
        protocol: Arc<dyn ProviderProtocol>,
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
    ) -> Result<Self, BrokerApiError> {
        Self::with_policy(protocol, transport, store, ISSUE_ATTEMPTS, ISSUE_RETRY_DELAY).await
    }

    /// Constructor with an explicit issuance retry policy.
    pub async fn with_policy(
        protocol: Arc<dyn ProviderProtocol>,
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, BrokerApiError> {
        let safety_margin = chrono::Duration::minutes(SAFETY_MARGIN_MINUTES);

        let initial = match store.load(protocol.id()) {
            Some(stored) if !stored.is_stale(safety_margin) => {
                info!(
                    "adopting stored {} credential, expires {}",
                    protocol.id(),
                    stored.expires_at
                );
                stored
            }
            _ => {
                info!(
                    "no usable stored {} credential, issuing a new one",
                    protocol.id()
                );
                issue_with_retry(
                    protocol.as_ref(),
                    transport.as_ref(),
                    &store,
                    max_attempts,
                    retry_delay,
                )
                .await?
            }
        };

        Ok(Self {
            protocol,
            transport,
            store,
            current: Mutex::new(initial),
            safety_margin,
            max_attempts,
            retry_delay,
        })
    }

    /// Returns a credential that is valid for at least the safety margin,
    /// reissuing first if the current one has gone stale.
    pub async fn get(&self) -> Result<AccessCredential, BrokerApiError> {
        let mut current = self.current.lock().await;
        if current.is_stale(self.safety_margin) {
            info!("{} credential is stale, reissuing", self.protocol.id());
            *current = self.issue_new().await?;
        }
        Ok(current.clone())
    }

    /// Forces reissuance, used when a request came back unauthorized even
    /// though the credential looked valid.
    pub async fn refresh(&self) -> Result<AccessCredential, BrokerApiError> {
        let mut current = self.current.lock().await;
        *current = self.issue_new().await?;
        Ok(current.clone())
    }

    async fn issue_new(&self) -> Result<AccessCredential, BrokerApiError> {
        issue_with_retry(
            self.protocol.as_ref(),
            self.transport.as_ref(),
            &self.store,
            self.max_attempts,
            self.retry_delay,
        )
        .await
    }
}

async fn issue_with_retry(
    protocol: &dyn ProviderProtocol,
    transport: &dyn HttpTransport,
    store: &CredentialStore,
    max_attempts: u32,
    retry_delay: Duration,
) -> Result<AccessCredential, BrokerApiError> {
    let attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        if attempt > 1 {
            let wait = retry_delay * (attempt - 1);
            warn!(
                "retrying {} credential issuance ({attempt}/{attempts}) in {wait:?}",
                protocol.id()
            );
            tokio::time::sleep(wait).await;
        }

        match issue_once(protocol, transport).await {
            Ok(credential) => {
                info!(
                    "issued {} credential, expires {}",
                    protocol.id(),
                    credential.expires_at
                );
                store.save(protocol.id(), &credential);
                return Ok(credential);
            }
            Err(error) => {
                warn!("{} credential issuance attempt failed: {error}", protocol.id());
                last_error = Some(error);
            }
        }
    }

    error!(
        "{} credential issuance failed after {attempts} attempts",
        protocol.id()
    );
    Err(last_error.unwrap_or_else(|| BrokerApiError::CredentialIssuance {
        provider: protocol.id().to_string(),
        message: "no issuance attempts were made".to_string(),
    }))
}

async fn issue_once(
    protocol: &dyn ProviderProtocol,
    transport: &dyn HttpTransport,
) -> Result<AccessCredential, BrokerApiError> {
    let issuance_error = |message: String| BrokerApiError::CredentialIssuance {
        provider: protocol.id().to_string(),
        message,
    };

    let request = protocol.issue_request();
    let raw = transport
        .send(protocol.base_url(), &request)
        .await
        .map_err(|error| issuance_error(error.to_string()))?;

    if raw.status != 200 {
        return Err(issuance_error(format!(
            "status {}: {}",
            raw.status,
            truncate_body(&raw.body, 100)
        )));
    }

    let payload: Value = serde_json::from_str(&raw.body)
        .map_err(|error| issuance_error(format!("invalid token response: {error}")))?;

    protocol.parse_issue_response(&payload)
}
