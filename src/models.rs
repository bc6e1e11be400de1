//! Shared data structures used throughout the application.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{AppError, Result};
use crate::utils::{format_usd, round_to};

/// Decoded inbound quote message.
///
/// Decoding is lenient: prices may arrive as numbers or numeric strings, and a
/// missing value decodes to `0.0` so that validation (not decoding) rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bid: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ask: f64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<i64>,
}

impl PriceUpdate {
    /// Build an update from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(AppError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

/// Latest best bid/ask held for one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeQuote {
    pub exchange_id: String,
    pub bid: f64,
    pub ask: f64,
    /// Epoch millis carried by the update (0 when the sender omitted it).
    pub observed_at: i64,
}

impl ExchangeQuote {
    pub fn empty(exchange_id: impl Into<String>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            bid: 0.0,
            ask: 0.0,
            observed_at: 0,
        }
    }
}

/// Direction of the arbitrage leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    /// Buy on the first configured exchange, sell on the second.
    FirstToSecond,
    /// Buy on the second configured exchange, sell on the first.
    SecondToFirst,
}

/// Emitted arbitrage signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalEvent {
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub spread_pct: f64,
    pub estimated_net_profit: f64,
    /// Set when the sell leg was lifted by forced-profit injection.
    pub forced: bool,
    pub timestamp: i64,
}

impl SignalEvent {
    /// `+$0.01` / `-$0.02` style indicator used in the text payload.
    pub fn profit_indicator(&self) -> String {
        if self.estimated_net_profit > 0.0 {
            format!("+${:.2}", self.estimated_net_profit)
        } else {
            format!("-${:.2}", self.estimated_net_profit.abs())
        }
    }

    /// Human-readable payload for the `arbitrage-signals` channel.
    pub fn to_text(&self) -> String {
        format!(
            "{} → {} | Buy: ${} | Sell: ${} | Spread: {:.3}% | If executed now: {}",
            self.buy_exchange.to_uppercase(),
            self.sell_exchange.to_uppercase(),
            format_usd(self.buy_price),
            format_usd(self.sell_price),
            self.spread_pct,
            self.profit_indicator(),
        )
    }
}

/// Outcome status of a simulated execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Executed,
}

/// Record of one accepted simulated execution.
///
/// Fields hold exact values; the published JSON is rounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub timestamp: i64,
    pub buy_exchange: String,
    pub sell_exchange: String,
    #[serde(serialize_with = "round2")]
    pub buy_price: f64,
    #[serde(serialize_with = "round2")]
    pub sell_price: f64,
    pub amount: f64,
    #[serde(serialize_with = "round2")]
    pub gross_profit: f64,
    #[serde(serialize_with = "round2")]
    pub fees: f64,
    #[serde(serialize_with = "round2")]
    pub net_profit: f64,
    #[serde(serialize_with = "round3")]
    pub profit_pct: f64,
    #[serde(serialize_with = "round2")]
    pub execution_time_ms: f64,
    pub status: ExecutionStatus,
}

/// Periodic performance snapshot published on `performance-metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    #[serde(serialize_with = "round2")]
    pub avg_latency_ms: f64,
    pub last_latency_ms: f64,
    #[serde(rename = "total_opportunities")]
    pub opportunities_total: u64,
    #[serde(rename = "total_orders")]
    pub orders_total: u64,
    #[serde(rename = "total_profit", serialize_with = "round2")]
    pub profit_total: f64,
    pub messages_processed: u64,
}

fn round2<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}

fn round3<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numbers_and_numeric_strings() {
        let raw = r#"{"exchange":"binance","bid":"50000.5","ask":50001.25,"timestamp":1700000000000}"#;
        let update: PriceUpdate = serde_json::from_str(raw).expect("json should parse");
        assert_eq!(update.exchange.as_deref(), Some("binance"));
        assert_eq!(update.bid, 50000.5);
        assert_eq!(update.ask, 50001.25);
        assert_eq!(update.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn missing_fields_decode_to_rejectable_defaults() {
        let update: PriceUpdate = serde_json::from_str(r#"{"bid":"oops"}"#).unwrap();
        assert_eq!(update.exchange, None);
        assert_eq!(update.bid, 0.0);
        assert_eq!(update.ask, 0.0);
        assert_eq!(update.timestamp, None);

        let float_ts: PriceUpdate =
            serde_json::from_str(r#"{"exchange":"kraken","timestamp":1700000000123.7}"#).unwrap();
        assert_eq!(float_ts.timestamp, Some(1_700_000_000_123));
    }

    #[test]
    fn non_object_values_are_decode_errors() {
        let err = PriceUpdate::from_value(serde_json::json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn signal_text_matches_dashboard_format() {
        let signal = SignalEvent {
            buy_exchange: "binance".into(),
            sell_exchange: "kraken".into(),
            buy_price: 50_000.0,
            sell_price: 50_250.5,
            spread_pct: 0.501,
            estimated_net_profit: -0.0123,
            forced: false,
            timestamp: 1,
        };
        assert_eq!(
            signal.to_text(),
            "BINANCE → KRAKEN | Buy: $50,000.00 | Sell: $50,250.50 | Spread: 0.501% | If executed now: -$0.01"
        );
    }

    #[test]
    fn execution_record_is_rounded_on_the_wire() {
        let record = ExecutionRecord {
            id: "ORD-1-0".into(),
            timestamp: 1,
            buy_exchange: "binance".into(),
            sell_exchange: "kraken".into(),
            buy_price: 100.004,
            sell_price: 101.506,
            amount: 0.01,
            gross_profit: 0.015_02,
            fees: 0.002_015,
            net_profit: 0.013_005,
            profit_pct: 1.300_449,
            execution_time_ms: 1.8771,
            status: ExecutionStatus::Executed,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["buy_price"], 100.0);
        assert_eq!(json["sell_price"], 101.51);
        assert_eq!(json["net_profit"], 0.01);
        assert_eq!(json["profit_pct"], 1.3);
        assert_eq!(json["execution_time_ms"], 1.88);
        assert_eq!(json["amount"], 0.01);
        assert_eq!(json["status"], "EXECUTED");
    }

    #[test]
    fn metrics_snapshot_uses_wire_names() {
        let snapshot = MetricsSnapshot {
            avg_latency_ms: 1.5,
            last_latency_ms: 2.0,
            opportunities_total: 3,
            orders_total: 2,
            profit_total: 0.25,
            messages_processed: 10,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["total_opportunities"], 3);
        assert_eq!(json["total_orders"], 2);
        assert_eq!(json["total_profit"], 0.25);
        assert_eq!(json["messages_processed"], 10);
    }
}
