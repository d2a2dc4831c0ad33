//! Environment-driven settings for the two providers.

use std::env;
use std::path::PathBuf;

use crate::errors::BrokerApiError;

/// Where credential records live unless `TOKEN_DIR` says otherwise.
pub const DEFAULT_TOKEN_DIR: &str = "config/tokens";

/// App key pairs and paths, loaded from the environment (a `.env` file is
/// honored when present).
#[derive(Clone, Debug)]
pub struct Settings {
    pub kiwoom_app_key: String,
    pub kiwoom_app_secret: String,
    pub kis_app_key: String,
    pub kis_app_secret: String,
    pub token_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, BrokerApiError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            kiwoom_app_key: require("KIWOOM_APP_KEY")?,
            kiwoom_app_secret: require("KIWOOM_APP_SECRET")?,
            kis_app_key: require("KIS_APP_KEY")?,
            kis_app_secret: require("KIS_APP_SECRET")?,
            token_dir: env::var("TOKEN_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_DIR)),
        })
    }
}

fn require(key: &str) -> Result<String, BrokerApiError> {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BrokerApiError::Configuration(format!("{key} is not set")))
}
