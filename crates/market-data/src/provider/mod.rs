//! Provider protocol abstraction and the two brokerage implementations.
//!
//! The protocol trait keeps the lifecycle manager and executor free of any
//! provider knowledge; the per-provider modules pair a [`ProviderProtocol`]
//! implementation with a high-level client exposing the operations the
//! provider actually serves (listings for Kiwoom, daily prices for KIS).

mod traits;

pub mod kiwoom;
pub mod korea_investment;

pub use traits::{BusinessStatus, ProviderProtocol};
