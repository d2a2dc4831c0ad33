//! Kiwoom Securities provider: instrument listings.
//!
//! # API Endpoints
//!
//! - Token issuance: `POST /oauth2/token` with the app key pair
//! - Stock listing: `POST /api/dostk/stkinfo` with header `api-id: ka10099`
//!
//! # Response Format
//!
//! Payloads embed a `return_code` discriminant (0 = success, as a number or
//! a string) with a `return_msg` detail. Listing rows arrive in a `list`
//! array of `{code, name, marketName, ...}` objects. Continuation markers
//! (`cont-yn` / `next-key`) travel in headers; the listing call requests a
//! single page, which covers the full market today.

use std::sync::Arc;

use chrono::{Duration, Local};
use log::{debug, error, warn};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::credential::{parse_expiry, AccessCredential, CredentialManager, CredentialStore};
use crate::errors::BrokerApiError;
use crate::models::{ApiRequest, MarketType, StockListing};
use crate::provider::{BusinessStatus, ProviderProtocol};
use crate::retry::RetryController;
use crate::transport::{HttpTransport, ReqwestTransport, RequestExecutor};

const PROVIDER_ID: &str = "KIWOOM";
const BASE_URL: &str = "https://api.kiwoom.com";
const TOKEN_PATH: &str = "/oauth2/token";
const STOCK_INFO_PATH: &str = "/api/dostk/stkinfo";
const STOCK_LIST_API_ID: &str = "ka10099";

/// Market name the provider reports for main-board KRX issues. KOSPI
/// listing responses also carry ETF/ELW rows under other names, so only
/// rows with this name are kept for the KOSPI market type.
const KRX_MARKET_NAME: &str = "거래소";

/// Wire protocol for Kiwoom: token issuance, auth headers, discriminant.
pub struct KiwoomProtocol {
    app_key: String,
    app_secret: String,
}

impl KiwoomProtocol {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }
}

fn return_code_ok(code: &Value) -> bool {
    match code {
        Value::Number(number) => number.as_i64() == Some(0),
        Value::String(text) => text == "0",
        _ => false,
    }
}

fn return_code_text(code: &Value) -> String {
    match code {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl ProviderProtocol for KiwoomProtocol {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn issue_request(&self) -> ApiRequest {
        ApiRequest::new(Method::POST, TOKEN_PATH)
            .header("Content-Type", "application/json;charset=UTF-8")
            .body(json!({
                "appkey": self.app_key,
                "appsecret": self.app_secret,
            }))
    }

    fn parse_issue_response(&self, payload: &Value) -> Result<AccessCredential, BrokerApiError> {
        let issuance_error = |message: String| BrokerApiError::CredentialIssuance {
            provider: PROVIDER_ID.to_string(),
            message,
        };

        if let Some(code) = payload.get("return_code") {
            if !return_code_ok(code) {
                let detail = payload
                    .get("return_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(issuance_error(format!(
                    "code {} - {detail}",
                    return_code_text(code)
                )));
            }
        }

        let token = payload
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| issuance_error("token response has no 'token' field".to_string()))?;
        let token_type = payload
            .get("token_type")
            .and_then(Value::as_str)
            .unwrap_or("bearer");

        let expires_at = match payload
            .get("expires_dt")
            .and_then(Value::as_str)
            .and_then(parse_expiry)
        {
            Some(expires_at) => expires_at,
            None => {
                warn!("{PROVIDER_ID} token response has no usable expires_dt, assuming 24h");
                Local::now().naive_local() + Duration::hours(24)
            }
        };

        Ok(AccessCredential {
            token: token.to_string(),
            token_type: token_type.to_string(),
            expires_at,
            refresh_token: None,
        })
    }

    fn auth_headers(&self, credential: &AccessCredential) -> Vec<(String, String)> {
        vec![
            (
                "Content-Type".to_string(),
                "application/json;charset=UTF-8".to_string(),
            ),
            (
                "authorization".to_string(),
                format!("Bearer {}", credential.token),
            ),
        ]
    }

    fn business_status(&self, payload: &Value) -> BusinessStatus {
        match payload.get("return_code") {
            Some(code) if !return_code_ok(code) => BusinessStatus::Failure {
                code: return_code_text(code),
                message: payload
                    .get("return_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            },
            _ => BusinessStatus::Success,
        }
    }
}

/// One listing row as the provider sends it.
#[derive(Debug, Deserialize)]
struct ListingRow {
    code: String,
    name: String,
    #[serde(rename = "marketName", default)]
    market_name: Option<String>,
    #[serde(rename = "lastPrice", default)]
    last_price: Option<String>,
    #[serde(rename = "auditInfo", default)]
    audit_info: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// High-level Kiwoom client: instrument listings per market segment.
pub struct KiwoomClient {
    executor: RequestExecutor,
    retry: RetryController,
}

impl KiwoomClient {
    /// Builds the production client. Fails when no credential can be loaded
    /// or issued.
    pub async fn connect(settings: &Settings) -> Result<Self, BrokerApiError> {
        let protocol: Arc<dyn ProviderProtocol> = Arc::new(KiwoomProtocol::new(
            settings.kiwoom_app_key.clone(),
            settings.kiwoom_app_secret.clone(),
        ));
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
        let store = CredentialStore::new(&settings.token_dir);
        Self::from_parts(protocol, transport, store, RetryController::new()).await
    }

    /// Builds a client from injected parts, for tests and for orchestrators
    /// that share a transport.
    pub async fn from_parts(
        protocol: Arc<dyn ProviderProtocol>,
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
        retry: RetryController,
    ) -> Result<Self, BrokerApiError> {
        let credentials =
            Arc::new(CredentialManager::new(protocol.clone(), transport.clone(), store).await?);
        Ok(Self {
            executor: RequestExecutor::new(protocol, transport, credentials),
            retry,
        })
    }

    /// Fetches the instrument listing for one market segment.
    ///
    /// Business-level failures degrade to an empty list with a logged
    /// reason, so batch callers keep going; transport-level failures are
    /// retried and surface as errors only once the budget is exhausted.
    pub async fn get_stock_list(
        &self,
        market: MarketType,
    ) -> Result<Vec<StockListing>, BrokerApiError> {
        let request = ApiRequest::new(Method::POST, STOCK_INFO_PATH)
            .header("api-id", STOCK_LIST_API_ID)
            .header("cont-yn", "N")
            .header("next-key", "")
            .body(json!({ "mrkt_tp": market.code() }));

        let executor = &self.executor;
        let response = self
            .retry
            .run(|| async {
                let response = executor.execute(&request).await?;
                if let Some(transient) = response.transient_error() {
                    return Err(transient);
                }
                Ok(response)
            })
            .await?;

        if !response.success {
            error!(
                "stock list request failed: code {} - {}",
                response.code.as_deref().unwrap_or("UNKNOWN"),
                response.message.as_deref().unwrap_or("unknown error")
            );
            return Ok(Vec::new());
        }

        let rows = match response.data.get("list").and_then(Value::as_array) {
            Some(rows) => rows,
            None => {
                warn!("stock list response has no 'list' array");
                return Ok(Vec::new());
            }
        };

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            let row: ListingRow = match serde_json::from_value(row.clone()) {
                Ok(row) => row,
                Err(reason) => {
                    debug!("skipping listing row without code/name: {reason}");
                    continue;
                }
            };
            // The KOSPI segment response includes non-main-board rows.
            if market == MarketType::Kospi && row.market_name.as_deref() != Some(KRX_MARKET_NAME) {
                continue;
            }
            listings.push(StockListing {
                code: row.code,
                name: row.name,
                market: row
                    .market_name
                    .unwrap_or_else(|| market.label().to_string()),
                last_price: row.last_price,
                audit_info: row.audit_info,
                state: row.state,
            });
        }

        debug!("collected {} listings for {}", listings.len(), market.label());
        Ok(listings)
    }
}
