use chrono::{Duration, Local, NaiveDateTime};

/// Fourteen-digit wall-clock expiry format used by the on-disk record and
/// by providers that report absolute expiry times.
pub const EXPIRY_FORMAT: &str = "%Y%m%d%H%M%S";

/// One provider's short-lived bearer credential.
///
/// Replaced wholesale on every issuance or refresh, never mutated in place.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessCredential {
    /// Opaque token value
    pub token: String,
    /// Token scheme as reported by the provider ("Bearer" / "bearer")
    pub token_type: String,
    /// Absolute expiry, provider-local wall-clock time
    pub expires_at: NaiveDateTime,
    /// Refresh artifact, when the provider hands one out
    pub refresh_token: Option<String>,
}

impl AccessCredential {
    /// Whether the credential is too close to expiry to attach to a new
    /// request. The margin keeps a request from being built with a token
    /// that expires mid-flight.
    pub fn is_stale(&self, safety_margin: Duration) -> bool {
        Local::now().naive_local() >= self.expires_at - safety_margin
    }
}

/// Parses a fourteen-digit `YYYYMMDDHHMMSS` expiry. Anything else is `None`.
pub fn parse_expiry(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(value, EXPIRY_FORMAT).ok()
}

/// Formats an expiry instant back into the fourteen-digit record form.
pub fn format_expiry(expires_at: NaiveDateTime) -> String {
    expires_at.format(EXPIRY_FORMAT).to_string()
}
