//! Kraken public API endpoints.

use async_trait::async_trait;
use datums_types::Trade;
use serde_json::Value;
use std::time::Duration;

use crate::{Result, SourceError};

/// Minimum pacing delay between consecutive remote calls, dictated by the
/// exchange's ledger rate limit.
pub const LEDGER_FREQUENCY: Duration = Duration::from_secs(6);

const ERROR_KEY: &str = "error";
const RESULT_KEY: &str = "result";
const LAST_KEY: &str = "last";

/// One page of trades from the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct TradesPage {
    /// The trades in this page, in exchange order.
    pub trades: Vec<Trade>,
    /// The remote-reported pagination cursor, nanoseconds since the epoch.
    pub last: i64,
}

/// The two remote endpoints the fetch loop needs.
///
/// Abstracted behind a trait so the paging loop can be exercised against a
/// scripted remote in tests.
#[async_trait]
pub trait TradesApi: Send + Sync {
    /// Current server time, seconds since the epoch.
    async fn server_time(&self) -> Result<i64>;

    /// Trades for `pair` after the nanosecond cursor `since`.
    async fn recent_trades(&self, pair: &str, since: i64) -> Result<TradesPage>;
}

/// HTTP client for the Kraken public API.
#[derive(Debug, Clone)]
pub struct KrakenApi {
    client: reqwest::Client,
    base_url: String,
}

impl KrakenApi {
    /// Default API host.
    pub const DEFAULT_URL: &'static str = "https://api.kraken.com";

    /// Creates a client against the default API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        Self::with_base_url(Self::DEFAULT_URL)
    }

    /// Creates a client against a custom host, used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: &str) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("datums/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let body: Value = self.client.get(&url).query(query).send().await?.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl TradesApi for KrakenApi {
    async fn server_time(&self) -> Result<i64> {
        let body = self.get_json("/0/public/Time", &[]).await?;
        let result = validate_response(&body)?;
        result
            .get("unixtime")
            .and_then(Value::as_i64)
            .ok_or_else(|| SourceError::InvalidFormat(body.to_string()))
    }

    async fn recent_trades(&self, pair: &str, since: i64) -> Result<TradesPage> {
        tracing::info!(pair, since, "querying remote trades");
        let body = self
            .get_json(
                "/0/public/Trades",
                &[("pair", pair.to_string()), ("since", since.to_string())],
            )
            .await?;
        let result = validate_response(&body)?;
        parse_trades_page(result)
    }
}

/// Checks the remote response envelope.
///
/// A missing `error` or `result` field is a format error; a non-empty error
/// list is a response error. Both are fatal for the current query call.
fn validate_response(body: &Value) -> Result<&Value> {
    let errors = body
        .get(ERROR_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::InvalidFormat(body.to_string()))?;
    if !errors.is_empty() {
        return Err(SourceError::Response(body.to_string()));
    }
    body.get(RESULT_KEY)
        .ok_or_else(|| SourceError::InvalidFormat(body.to_string()))
}

/// Extracts the trade list and pagination cursor from a validated `result`.
///
/// The pair key is the single key that is not `last`; each trade row is an
/// array starting with `[price, volume, timestamp, ...]` where price and
/// volume arrive as decimal strings and the timestamp as a float. Extra
/// trailing row fields are ignored.
fn parse_trades_page(result: &Value) -> Result<TradesPage> {
    let object = result
        .as_object()
        .ok_or_else(|| SourceError::InvalidFormat(result.to_string()))?;
    let pair_key = object
        .keys()
        .find(|k| *k != LAST_KEY)
        .ok_or_else(|| SourceError::InvalidFormat(result.to_string()))?;

    let rows = object
        .get(pair_key)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::InvalidFormat(result.to_string()))?;
    let trades = rows
        .iter()
        .map(parse_trade_row)
        .collect::<Result<Vec<_>>>()?;

    let last = object
        .get(LAST_KEY)
        .and_then(parse_integer)
        .ok_or_else(|| SourceError::InvalidFormat(result.to_string()))?;

    Ok(TradesPage { trades, last })
}

fn parse_trade_row(row: &Value) -> Result<Trade> {
    let fields = row
        .as_array()
        .filter(|f| f.len() >= 3)
        .ok_or_else(|| SourceError::InvalidFormat(row.to_string()))?;

    let mut numbers = fields.iter().take(3).map(parse_number);
    match (numbers.next(), numbers.next(), numbers.next()) {
        (Some(Some(price)), Some(Some(volume)), Some(Some(timestamp))) => {
            Ok(Trade::new(price, volume, timestamp))
        }
        _ => Err(SourceError::InvalidFormat(row.to_string())),
    }
}

/// Accepts a JSON number or a decimal string.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts a JSON integer or an integer string, as the `last` cursor is
/// serialized either way.
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_error_field_is_a_format_error() {
        let body = json!({"result": {}});
        assert!(matches!(
            validate_response(&body),
            Err(SourceError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_result_field_is_a_format_error() {
        let body = json!({"error": []});
        assert!(matches!(
            validate_response(&body),
            Err(SourceError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_remote_errors_are_fatal() {
        let body = json!({"error": ["EService:Unavailable"], "result": {}});
        assert!(matches!(
            validate_response(&body),
            Err(SourceError::Response(_))
        ));
    }

    #[test]
    fn test_parse_trades_page() {
        let result = json!({
            "XXBTZUSD": [
                ["10.0", "0.1", 1_500_000_000.0, "b", "l", ""],
                ["10.5", "0.2", 1_500_000_001.3, "s", "m", ""],
            ],
            "last": "1500000002000000000",
        });

        let page = parse_trades_page(&result).unwrap();

        assert_eq!(
            page.trades,
            vec![
                Trade::new(10.0, 0.1, 1_500_000_000.0),
                Trade::new(10.5, 0.2, 1_500_000_001.3),
            ]
        );
        assert_eq!(page.last, 1_500_000_002_000_000_000);
    }

    #[test]
    fn test_parse_trades_page_with_numeric_last() {
        let result = json!({"PAIR": [], "last": 42});
        let page = parse_trades_page(&result).unwrap();
        assert!(page.trades.is_empty());
        assert_eq!(page.last, 42);
    }

    #[test]
    fn test_malformed_trade_row_is_a_format_error() {
        let result = json!({"PAIR": [["10.0", "0.1"]], "last": "0"});
        assert!(matches!(
            parse_trades_page(&result),
            Err(SourceError::InvalidFormat(_))
        ));
    }
}
