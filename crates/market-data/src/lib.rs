//! KRX Market Data Crate
//!
//! Resilient credential lifecycle and request execution for two Korean
//! brokerage HTTP APIs: Kiwoom Securities (instrument listings) and Korea
//! Investment Securities (daily price history). The two upstreams use
//! incompatible auth schemes, response envelopes, and error codes; this
//! crate folds both into one uniform surface.
//!
//! # Overview
//!
//! The crate provides:
//! - Per-provider bearer credential issuance, durable storage, and
//!   proactive refresh with a staleness safety margin
//! - Request execution with transparent re-authentication on 401 and
//!   normalization of every outcome into one response envelope
//! - Bounded retry with linear backoff that distinguishes fatal credential
//!   failures (fail fast) from transient ones (retry)
//! - Continuation-marker pagination for chunked time-series responses
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +--------------------+
//! |      Caller      | --> |  RetryController   |  (bounded retry, backoff)
//! +------------------+     +--------------------+
//!                                    |
//!                                    v
//!                          +--------------------+
//!                          |  RequestExecutor   |  (auth, 401 refresh, normalize)
//!                          +--------------------+
//!                              |            |
//!                              v            v
//!                  +-------------------+  +------------------+
//!                  | CredentialManager |  |  HttpTransport   |  (reqwest)
//!                  +-------------------+  +------------------+
//!                              |
//!                              v
//!                  +-------------------+
//!                  |  CredentialStore  |  (one JSON record per provider)
//!                  +-------------------+
//! ```
//!
//! Time-series calls add a [`Paginator`] between the caller and the retry
//! controller, fetching pages strictly sequentially because each page
//! depends on the previous response's continuation marker.
//!
//! # Failure policy
//!
//! [`BrokerApiError::CredentialIssuance`] is fatal: it is never retried,
//! and binaries are expected to exit non-zero when it surfaces. Business
//! errors (HTTP 200 with a failing discriminant) are not errors at all:
//! they degrade to empty results so batch callers continue with the other
//! instruments.

pub mod config;
pub mod credential;
pub mod errors;
pub mod models;
pub mod names;
pub mod pagination;
pub mod provider;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the types callers touch day to day.
pub use config::Settings;
pub use credential::{AccessCredential, CredentialManager, CredentialStore};
pub use errors::{BrokerApiError, RetryClass};
pub use models::{
    ApiRequest, ApiResponse, DailyPrice, FailureKind, MarketType, PricePeriod, StockListing,
};
pub use names::StockNameCache;
pub use pagination::{ContinuationState, Page, Paginator};
pub use provider::kiwoom::{KiwoomClient, KiwoomProtocol};
pub use provider::korea_investment::{KoreaInvestmentClient, KoreaInvestmentProtocol};
pub use provider::{BusinessStatus, ProviderProtocol};
pub use retry::RetryController;
pub use transport::{HttpTransport, RawResponse, ReqwestTransport, RequestExecutor, TransportError};
