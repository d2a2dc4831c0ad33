use serde::{Deserialize, Serialize};

/// KRX market segment selector for listing queries.
///
/// The listing provider encodes these as `mrkt_tp` values `"0"` and `"10"`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarketType {
    Kospi,
    Kosdaq,
}

impl MarketType {
    /// Provider wire code for the `mrkt_tp` request field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Kospi => "0",
            Self::Kosdaq => "10",
        }
    }

    /// Display name used when a row carries no market name of its own.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kospi => "KOSPI",
            Self::Kosdaq => "KOSDAQ",
        }
    }
}

/// One listed instrument as returned by the listing provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockListing {
    /// Six-digit issue code, e.g. "005930"
    pub code: String,
    /// Display name, e.g. "삼성전자"
    pub name: String,
    /// Market segment name as reported by the provider
    pub market: String,
    /// Last traded price, verbatim from the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<String>,
    /// Audit / supervision flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_info: Option<String>,
    /// Listing state flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
