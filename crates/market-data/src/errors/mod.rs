//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`BrokerApiError`]: The main error enum for all brokerage API operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to a brokerage API.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the retry
/// controller handles the error.
///
/// Business-level failures (HTTP 200 with a failing success discriminant) are
/// not errors: they are surfaced through the response envelope so batch
/// callers can degrade gracefully and continue with other instruments.
#[derive(Error, Debug)]
pub enum BrokerApiError {
    /// A credential could not be obtained after exhausting the issuance
    /// retry budget. This is fatal: no request against the provider can
    /// succeed without a credential, so callers must abort rather than
    /// retry around it.
    #[error("credential issuance failed for {provider}: {message}")]
    CredentialIssuance {
        /// The provider whose issuance failed
        provider: String,
        /// The last underlying failure reason
        message: String,
    },

    /// A single request attempt failed in a way that may succeed on retry:
    /// timeout, connection failure, non-200 status, or an unparseable body.
    #[error("transient request failure ({code}): {message}")]
    Transient {
        /// Normalized failure code (`TIMEOUT`, `CONNECTION_ERROR`, an HTTP
        /// status, or `INVALID_FORMAT`)
        code: String,
        /// Human-readable failure detail
        message: String,
    },

    /// The retry controller exhausted its attempt budget on a transient
    /// failure. Carries the last underlying failure for diagnostics.
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        /// How many attempts were made before giving up
        attempts: u32,
        /// The failure observed on the final attempt
        #[source]
        source: Box<BrokerApiError>,
    },

    /// The caller supplied an invalid symbol or date argument. Rejected
    /// before any network call and never retried.
    #[error("invalid input: {0}")]
    MalformedInput(String),

    /// Required configuration (API keys, paths) is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BrokerApiError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use krx_market_data::errors::{BrokerApiError, RetryClass};
    ///
    /// let error = BrokerApiError::Transient {
    ///     code: "TIMEOUT".to_string(),
    ///     message: "request timed out".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = BrokerApiError::MalformedInput("bad symbol".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // A missing credential dooms every future request too.
            Self::CredentialIssuance { .. } => RetryClass::Fatal,

            Self::Transient { .. } => RetryClass::Transient,

            // Terminal for this request only.
            Self::MaxRetriesExceeded { .. }
            | Self::MalformedInput(_)
            | Self::Configuration(_) => RetryClass::Never,
        }
    }
}
