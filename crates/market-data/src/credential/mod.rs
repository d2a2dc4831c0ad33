//! Credential lifecycle: issuance, durable storage, staleness, refresh.
//!
//! The [`CredentialManager`] owns one provider's credential exclusively and
//! is the only writer to that provider's [`CredentialStore`] record. The
//! request executor never mutates a credential; it reads the current one and
//! asks the manager for a refresh when a provider answers 401.

#[allow(clippy::module_inception)]
mod credential;
mod manager;
mod store;

pub use credential::{format_expiry, parse_expiry, AccessCredential, EXPIRY_FORMAT};
pub use manager::{CredentialManager, SAFETY_MARGIN_MINUTES};
pub use store::CredentialStore;
