use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Chart granularity selector for time-series queries.
///
/// The time-series provider encodes these as `FID_PERIOD_DIV_CODE` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PricePeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PricePeriod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Yearly => "Y",
        }
    }
}

/// One OHLCV row of a daily (or weekly/monthly/yearly) price series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyPrice {
    /// Trading date
    pub date: NaiveDate,

    /// Opening price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// High price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Low price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Closing price (required)
    pub close: Decimal,

    /// Accumulated trading volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    /// Accumulated trading value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover: Option<Decimal>,
}

impl DailyPrice {
    /// Parses one `output2` chart row keyed by the provider's native field
    /// names (`stck_bsop_date`, `stck_clpr`, ...). Date and close are
    /// required; the rest degrade to `None`.
    pub fn from_chart_row(row: &Value) -> Result<Self, String> {
        let date_str = row
            .get("stck_bsop_date")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing stck_bsop_date".to_string())?;
        let date = NaiveDate::parse_from_str(date_str, "%Y%m%d")
            .map_err(|_| format!("invalid trade date: {date_str}"))?;

        let close = field_decimal(row, "stck_clpr")
            .ok_or_else(|| "missing or invalid stck_clpr".to_string())?;

        Ok(Self {
            date,
            open: field_decimal(row, "stck_oprc"),
            high: field_decimal(row, "stck_hgpr"),
            low: field_decimal(row, "stck_lwpr"),
            close,
            volume: row
                .get("acml_vol")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            turnover: field_decimal(row, "acml_tr_pbmn"),
        })
    }
}

fn field_decimal(row: &Value, field: &str) -> Option<Decimal> {
    row.get(field).and_then(Value::as_str).and_then(|s| s.parse().ok())
}
