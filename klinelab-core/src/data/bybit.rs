//! Bybit v5 kline source.
//!
//! One signed GET per page against `/v5/market/kline`. The endpoint answers
//!
//! ```json
//! { "retCode": 0, "retMsg": "OK",
//!   "result": { "symbol": "BTCUSDT", "category": "linear",
//!               "list": [["1700000000000", "37000.5", "37100", "36900", "37050", "12.3", "455000"], ...] } }
//! ```
//!
//! with rows newest-first and every number encoded as a string. Rows are
//! decoded into `Candle`s here; the order is left as received.

use super::error::DataError;
use super::signer::{auth_headers, HmacSigner, Signer, SigningCredentials};
use super::source::{KlinePage, KlineQuery, KlineSource};
use crate::config::{ApiConfig, Credentials};
use crate::domain::Candle;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const KLINE_PATH: &str = "/v5/market/kline";

#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(rename = "retCode", default)]
    ret_code: Option<i64>,
    #[serde(rename = "retMsg", default)]
    ret_msg: Option<String>,
    #[serde(default)]
    result: Option<KlineResult>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Option<Vec<Vec<Value>>>,
}

/// Decode a kline response body.
///
/// Invalid JSON and undecodable rows are errors. A well-formed answer with a
/// non-zero `retCode` or without `result.list` is `KlinePage::Malformed`.
pub fn parse_page(body: &str) -> Result<KlinePage, DataError> {
    let resp: KlineResponse = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormat(format!("invalid kline JSON: {e}")))?;

    if let Some(code) = resp.ret_code.filter(|c| *c != 0) {
        let msg = resp.ret_msg.unwrap_or_default();
        return Ok(KlinePage::Malformed(format!("retCode {code}: {msg}")));
    }

    let Some(rows) = resp.result.and_then(|r| r.list) else {
        return Ok(KlinePage::Malformed("response has no result.list".into()));
    };

    let candles = rows
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(KlinePage::Candles(candles))
}

/// `[startTime, open, high, low, close, volume, turnover?]`
fn parse_row(row: &[Value]) -> Result<Candle, DataError> {
    if row.len() < 6 {
        return Err(DataError::ResponseFormat(format!(
            "kline row has {} fields, expected at least 6",
            row.len()
        )));
    }
    let timestamp = number(&row[0], "start_time")?;
    if timestamp.fract() != 0.0 || timestamp < 0.0 {
        return Err(DataError::ResponseFormat(format!(
            "invalid start_time {timestamp}"
        )));
    }
    Ok(Candle::new(
        timestamp as i64,
        number(&row[1], "open")?,
        number(&row[2], "high")?,
        number(&row[3], "low")?,
        number(&row[4], "close")?,
        number(&row[5], "volume")?,
    ))
}

fn number(value: &Value, field: &str) -> Result<f64, DataError> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| DataError::ResponseFormat(format!("failed to parse {field} '{value}'")))
}

/// Blocking HTTP client for the kline endpoint.
pub struct BybitClient {
    client: reqwest::blocking::Client,
    base_url: String,
    recv_window: u64,
    credentials: Option<Credentials>,
    signer: Box<dyn Signer>,
}

impl BybitClient {
    pub fn new(api: &ApiConfig, credentials: Option<Credentials>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("klinelab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            recv_window: api.recv_window,
            credentials: credentials.filter(Credentials::is_complete),
            signer: Box::new(HmacSigner),
        })
    }

    pub fn with_signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Box::new(signer);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.credentials.is_some()
    }

    fn kline_url(&self) -> String {
        format!("{}{KLINE_PATH}", self.base_url)
    }
}

impl KlineSource for BybitClient {
    fn name(&self) -> &str {
        "bybit"
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<KlinePage, DataError> {
        let url = self.kline_url();
        let mut request = self.client.get(&url).query(query);

        if let Some(creds) = &self.credentials {
            let payload = query.to_payload()?;
            let signing = SigningCredentials {
                api_key: &creds.api_key,
                api_secret: &creds.api_secret,
                recv_window: self.recv_window,
                timestamp: chrono::Utc::now().timestamp_millis(),
            };
            for (name, value) in auth_headers(self.signer.as_ref(), &payload, &signing)? {
                request = request.header(name, value);
            }
        }

        debug!(start = query.start, end = query.end, "requesting kline page");

        let resp = request
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::Authentication(format!(
                "HTTP {status} from {KLINE_PATH}"
            )));
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                endpoint: KLINE_PATH.to_string(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::ResponseFormat(format!("failed to read body: {e}")))?;
        parse_page(&body)
    }
}
