//! Korea Investment Securities (KIS) provider: daily price history.
//!
//! # API Endpoints
//!
//! - Token issuance: `POST /oauth2/tokenP` with a client-credentials grant
//! - Daily chart: `GET /uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice`
//!   with header `tr_id: FHKST03010100`
//!
//! # Response Format
//!
//! Payloads embed an `rt_cd` discriminant (string "0" = success) with an
//! `msg1` detail. Chart rows arrive in `output2` keyed by provider-native
//! field names (`stck_bsop_date`, `stck_clpr`, ...), newest first;
//! `output1` carries symbol metadata including the display name.
//! Continuation is signalled through the `tr_cont` response header: `M`
//! means more pages, anything else ends the series.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, NaiveDate};
use log::{debug, warn};
use reqwest::Method;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::credential::{AccessCredential, CredentialManager, CredentialStore};
use crate::errors::BrokerApiError;
use crate::models::{ApiRequest, DailyPrice, PricePeriod};
use crate::names::StockNameCache;
use crate::pagination::{Page, Paginator, DEFAULT_INTER_PAGE_DELAY};
use crate::provider::{BusinessStatus, ProviderProtocol};
use crate::retry::RetryController;
use crate::transport::{HttpTransport, ReqwestTransport, RequestExecutor};

const PROVIDER_ID: &str = "KIS";
const BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
const TOKEN_PATH: &str = "/oauth2/tokenP";
const DAILY_CHART_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice";
const DAILY_CHART_TR_ID: &str = "FHKST03010100";

/// `FID_COND_MRKT_DIV_CODE` value for the KRX cash market.
const KRX_MARKET_CODE: &str = "J";

/// `tr_cont` response header value meaning more pages remain.
const CONTINUATION_MORE: &str = "M";

/// Default lookback window when the caller gives no start date.
const DEFAULT_LOOKBACK_DAYS: i64 = 100;

/// Token lifetime the provider applies when it omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 86_400;

/// Wire protocol for KIS: token issuance, auth headers, discriminant.
pub struct KoreaInvestmentProtocol {
    app_key: String,
    app_secret: String,
}

impl KoreaInvestmentProtocol {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }
}

impl ProviderProtocol for KoreaInvestmentProtocol {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn issue_request(&self) -> ApiRequest {
        ApiRequest::new(Method::POST, TOKEN_PATH)
            .header("content-type", "application/json")
            .body(json!({
                "grant_type": "client_credentials",
                "appkey": self.app_key,
                "appsecret": self.app_secret,
            }))
    }

    fn parse_issue_response(&self, payload: &Value) -> Result<AccessCredential, BrokerApiError> {
        let token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| BrokerApiError::CredentialIssuance {
                provider: PROVIDER_ID.to_string(),
                message: "token response has no 'access_token' field".to_string(),
            })?;
        let token_type = payload
            .get("token_type")
            .and_then(Value::as_str)
            .unwrap_or("Bearer");
        let expires_in = payload
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        Ok(AccessCredential {
            token: token.to_string(),
            token_type: token_type.to_string(),
            expires_at: Local::now().naive_local() + Duration::seconds(expires_in),
            refresh_token: payload
                .get("refresh_token")
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    fn auth_headers(&self, credential: &AccessCredential) -> Vec<(String, String)> {
        vec![
            (
                "Content-Type".to_string(),
                "application/json; charset=utf-8".to_string(),
            ),
            (
                "authorization".to_string(),
                format!("Bearer {}", credential.token),
            ),
            ("appkey".to_string(), self.app_key.clone()),
            ("appsecret".to_string(), self.app_secret.clone()),
        ]
    }

    fn business_status(&self, payload: &Value) -> BusinessStatus {
        match payload.get("rt_cd").and_then(Value::as_str) {
            Some(code) if code != "0" => BusinessStatus::Failure {
                code: code.to_string(),
                message: payload
                    .get("msg1")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            },
            _ => BusinessStatus::Success,
        }
    }
}

/// High-level KIS client: daily OHLCV history with transparent pagination.
pub struct KoreaInvestmentClient {
    executor: RequestExecutor,
    retry: RetryController,
    inter_page_delay: StdDuration,
    names: Arc<StockNameCache>,
}

impl KoreaInvestmentClient {
    /// Builds the production client. Fails when no credential can be loaded
    /// or issued.
    pub async fn connect(
        settings: &Settings,
        names: Arc<StockNameCache>,
    ) -> Result<Self, BrokerApiError> {
        let protocol: Arc<dyn ProviderProtocol> = Arc::new(KoreaInvestmentProtocol::new(
            settings.kis_app_key.clone(),
            settings.kis_app_secret.clone(),
        ));
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
        let store = CredentialStore::new(&settings.token_dir);
        Self::from_parts(protocol, transport, store, RetryController::new(), names).await
    }

    /// Builds a client from injected parts, for tests and for orchestrators
    /// that share a transport.
    pub async fn from_parts(
        protocol: Arc<dyn ProviderProtocol>,
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
        retry: RetryController,
        names: Arc<StockNameCache>,
    ) -> Result<Self, BrokerApiError> {
        let credentials =
            Arc::new(CredentialManager::new(protocol.clone(), transport.clone(), store).await?);
        Ok(Self {
            executor: RequestExecutor::new(protocol, transport, credentials),
            retry,
            inter_page_delay: DEFAULT_INTER_PAGE_DELAY,
            names,
        })
    }

    /// Overrides the pacing delay between chart pages.
    pub fn with_inter_page_delay(mut self, delay: StdDuration) -> Self {
        self.inter_page_delay = delay;
        self
    }

    /// Fetches daily (or weekly/monthly/yearly) OHLCV history for one
    /// symbol, following continuation markers until the series is complete
    /// or `max_rows` is reached.
    ///
    /// Defaults: `end` is today, `start` is 100 days before `end`. Rows are
    /// returned sorted ascending by trade date. Business-level failures
    /// degrade to an empty result with a logged reason.
    pub async fn get_daily_price(
        &self,
        code: &str,
        period: PricePeriod,
        adjusted: bool,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        max_rows: Option<usize>,
    ) -> Result<Vec<DailyPrice>, BrokerApiError> {
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BrokerApiError::MalformedInput(format!(
                "stock code must be 6 digits, got {code:?}"
            )));
        }
        let end = end.unwrap_or_else(|| Local::now().date_naive());
        let start = start.unwrap_or_else(|| end - Duration::days(DEFAULT_LOOKBACK_DAYS));
        if start > end {
            return Err(BrokerApiError::MalformedInput(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let executor = &self.executor;
        let retry = &self.retry;
        let names = &self.names;

        let rows = Paginator::new(max_rows)
            .with_delay(self.inter_page_delay)
            .collect(|cursor| async move {
                let mut request = ApiRequest::new(Method::GET, DAILY_CHART_PATH)
                    .header("tr_id", DAILY_CHART_TR_ID)
                    .query("FID_COND_MRKT_DIV_CODE", KRX_MARKET_CODE)
                    .query("FID_INPUT_ISCD", code)
                    .query("FID_INPUT_DATE_1", start.format("%Y%m%d").to_string())
                    .query("FID_INPUT_DATE_2", end.format("%Y%m%d").to_string())
                    .query("FID_PERIOD_DIV_CODE", period.code())
                    .query("FID_ORG_ADJ_PRC", if adjusted { "1" } else { "0" });
                if let Some(marker) = cursor {
                    request = request.header("tr_cont", marker);
                }

                let response = retry
                    .run(|| async {
                        let response = executor.execute(&request).await?;
                        if let Some(transient) = response.transient_error() {
                            return Err(transient);
                        }
                        Ok(response)
                    })
                    .await?;

                if !response.success {
                    warn!(
                        "daily price request for {code} failed: code {} - {}",
                        response.code.as_deref().unwrap_or("UNKNOWN"),
                        response.message.as_deref().unwrap_or("unknown error")
                    );
                    return Ok(Page::default());
                }

                if let Some(name) = response
                    .data
                    .pointer("/output1/hts_kor_isnm")
                    .and_then(Value::as_str)
                {
                    names.insert(code, name);
                }

                let rows = match response.data.get("output2").and_then(Value::as_array) {
                    Some(rows) => rows.clone(),
                    None => {
                        warn!("daily price response for {code} has no output2 data");
                        Vec::new()
                    }
                };
                let next = (response.headers.get("tr_cont").map(String::as_str)
                    == Some(CONTINUATION_MORE))
                .then(|| "N".to_string());

                Ok(Page { rows, next })
            })
            .await?;

        let mut prices: Vec<DailyPrice> = rows
            .iter()
            .filter_map(|row| match DailyPrice::from_chart_row(row) {
                Ok(price) => Some(price),
                Err(reason) => {
                    warn!("skipping malformed price row for {code}: {reason}");
                    None
                }
            })
            .collect();
        // Provider pages arrive newest first; callers get oldest first.
        prices.sort_by_key(|price| price.date);

        debug!("collected {} price rows for {code}", prices.len());
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        json_response, json_response_with_headers, kis_token_body, StubTransport,
    };
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn protocol() -> KoreaInvestmentProtocol {
        KoreaInvestmentProtocol::new("app-key", "app-secret")
    }

    async fn client_with(
        transport: Arc<StubTransport>,
        dir: &std::path::Path,
    ) -> KoreaInvestmentClient {
        KoreaInvestmentClient::from_parts(
            Arc::new(protocol()),
            transport,
            CredentialStore::new(dir),
            RetryController::with_policy(3, StdDuration::ZERO),
            Arc::new(StockNameCache::new()),
        )
        .await
        .expect("client")
        .with_inter_page_delay(StdDuration::ZERO)
    }

    fn chart_row(date: &str, close: &str) -> Value {
        json!({"stck_bsop_date": date, "stck_clpr": close})
    }

    fn chart_body(rows: Vec<Value>) -> Value {
        json!({
            "rt_cd": "0",
            "output1": {"hts_kor_isnm": "삼성전자"},
            "output2": rows
        })
    }

    #[test]
    fn test_issue_request_uses_client_credentials_grant() {
        let request = protocol().issue_request();
        assert_eq!(request.path, "/oauth2/tokenP");
        let body = request.body.expect("body");
        assert_eq!(body["grant_type"], "client_credentials");
        assert_eq!(body["appkey"], "app-key");
    }

    #[test]
    fn test_parse_issue_response_expiry_from_expires_in() {
        let payload = json!({
            "access_token": "issued",
            "token_type": "Bearer",
            "expires_in": 86400
        });
        let credential = protocol().parse_issue_response(&payload).expect("parse");
        assert_eq!(credential.token, "issued");
        // A day out, so comfortably beyond the 10-minute margin.
        assert!(!credential.is_stale(Duration::minutes(10)));
        assert!(credential.is_stale(Duration::hours(25)));
    }

    #[test]
    fn test_parse_issue_response_requires_access_token() {
        let payload = json!({"token_type": "Bearer"});
        assert!(matches!(
            protocol().parse_issue_response(&payload),
            Err(BrokerApiError::CredentialIssuance { ref provider, .. }) if provider == "KIS"
        ));
    }

    #[test]
    fn test_business_status_reads_rt_cd() {
        let protocol = protocol();
        assert_eq!(
            protocol.business_status(&json!({"rt_cd": "0", "msg1": "정상처리"})),
            BusinessStatus::Success
        );
        assert!(matches!(
            protocol.business_status(&json!({"rt_cd": "1", "msg1": "조회 실패"})),
            BusinessStatus::Failure { ref code, ref message }
                if code == "1" && message == "조회 실패"
        ));
    }

    #[test]
    fn test_auth_headers_include_app_key_pair() {
        let credential = AccessCredential {
            token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_at: Local::now().naive_local() + Duration::hours(1),
            refresh_token: None,
        };
        let headers = protocol().auth_headers(&credential);
        assert!(headers.contains(&("authorization".to_string(), "Bearer abc".to_string())));
        assert!(headers.contains(&("appkey".to_string(), "app-key".to_string())));
        assert!(headers.contains(&("appsecret".to_string(), "app-secret".to_string())));
    }

    #[tokio::test]
    async fn test_get_daily_price_rejects_bad_symbol() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![Ok(json_response(
            200,
            kis_token_body("t1", 86400),
        ))]));
        let client = client_with(transport.clone(), dir.path()).await;

        for bad in ["5930", "ABCDEF", "0059301", ""] {
            let result = client
                .get_daily_price(bad, PricePeriod::Daily, true, None, None, None)
                .await;
            assert!(matches!(result, Err(BrokerApiError::MalformedInput(_))));
        }
        // Validation happens before any chart request.
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_get_daily_price_rejects_inverted_range() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![Ok(json_response(
            200,
            kis_token_body("t1", 86400),
        ))]));
        let client = client_with(transport, dir.path()).await;

        let start = NaiveDate::from_ymd_opt(2024, 2, 1).expect("date");
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let result = client
            .get_daily_price("005930", PricePeriod::Daily, true, Some(start), Some(end), None)
            .await;
        assert!(matches!(result, Err(BrokerApiError::MalformedInput(_))));
    }

    #[tokio::test]
    async fn test_get_daily_price_sorts_ascending_by_date() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![
            Ok(json_response(200, kis_token_body("t1", 86400))),
            Ok(json_response(
                200,
                chart_body(vec![
                    chart_row("20240102", "100"),
                    chart_row("20240101", "90"),
                ]),
            )),
        ]));
        let client = client_with(transport, dir.path()).await;

        let prices = client
            .get_daily_price("005930", PricePeriod::Daily, true, None, None, None)
            .await
            .expect("prices");
        assert_eq!(prices.len(), 2);
        assert_eq!(
            prices[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
        );
        assert_eq!(prices[0].close, dec!(90));
        assert_eq!(
            prices[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).expect("date")
        );
    }

    #[tokio::test]
    async fn test_get_daily_price_follows_continuation_header() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![
            Ok(json_response(200, kis_token_body("t1", 86400))),
            Ok(json_response_with_headers(
                200,
                chart_body(vec![chart_row("20240103", "110")]),
                &[("tr_cont", "M")],
            )),
            Ok(json_response_with_headers(
                200,
                chart_body(vec![chart_row("20240102", "100")]),
                &[("tr_cont", "D")],
            )),
        ]));
        let client = client_with(transport.clone(), dir.path()).await;

        let prices = client
            .get_daily_price("005930", PricePeriod::Daily, true, None, None, None)
            .await
            .expect("prices");
        assert_eq!(prices.len(), 2);

        // Second chart request carried the continuation marker.
        let calls = transport.calls();
        let (_, second_page) = &calls[2];
        assert!(second_page
            .headers
            .contains(&("tr_cont".to_string(), "N".to_string())));
        // The first one did not.
        let (_, first_page) = &calls[1];
        assert!(!first_page.headers.iter().any(|(name, _)| name == "tr_cont"));
    }

    #[tokio::test]
    async fn test_get_daily_price_caps_rows() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![
            Ok(json_response(200, kis_token_body("t1", 86400))),
            Ok(json_response_with_headers(
                200,
                chart_body(vec![
                    chart_row("20240105", "105"),
                    chart_row("20240104", "104"),
                    chart_row("20240103", "103"),
                ]),
                &[("tr_cont", "M")],
            )),
        ]));
        let client = client_with(transport.clone(), dir.path()).await;

        let prices = client
            .get_daily_price("005930", PricePeriod::Daily, true, None, None, Some(2))
            .await
            .expect("prices");
        // Cap hit inside page 1: the two newest rows, returned ascending.
        assert_eq!(prices.len(), 2);
        assert_eq!(
            prices[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 4).expect("date")
        );
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_get_daily_price_records_stock_name() {
        let dir = tempdir().expect("tempdir");
        let names = Arc::new(StockNameCache::new());
        let transport = Arc::new(StubTransport::new(vec![
            Ok(json_response(200, kis_token_body("t1", 86400))),
            Ok(json_response(200, chart_body(vec![chart_row("20240102", "100")]))),
        ]));
        let client = KoreaInvestmentClient::from_parts(
            Arc::new(protocol()),
            transport,
            CredentialStore::new(dir.path()),
            RetryController::with_policy(3, StdDuration::ZERO),
            names.clone(),
        )
        .await
        .expect("client")
        .with_inter_page_delay(StdDuration::ZERO);

        client
            .get_daily_price("005930", PricePeriod::Daily, true, None, None, None)
            .await
            .expect("prices");
        assert_eq!(names.resolve("005930"), "삼성전자");
    }

    #[tokio::test]
    async fn test_get_daily_price_business_error_degrades_to_empty() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![
            Ok(json_response(200, kis_token_body("t1", 86400))),
            Ok(json_response(
                200,
                json!({"rt_cd": "7", "msg1": "조회할 자료가 없습니다"}),
            )),
        ]));
        let client = client_with(transport, dir.path()).await;

        let prices = client
            .get_daily_price("005930", PricePeriod::Daily, true, None, None, None)
            .await
            .expect("prices");
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_get_daily_price_skips_malformed_rows() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(StubTransport::new(vec![
            Ok(json_response(200, kis_token_body("t1", 86400))),
            Ok(json_response(
                200,
                chart_body(vec![
                    chart_row("20240102", "100"),
                    json!({"stck_bsop_date": "20240101"}),
                ]),
            )),
        ]));
        let client = client_with(transport, dir.path()).await;

        let prices = client
            .get_daily_price("005930", PricePeriod::Daily, true, None, None, None)
            .await
            .expect("prices");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].close, dec!(100));
    }
}
