//! Configuration loader and application settings.

use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AppError, Result};

/// Payload format for the `arbitrage-signals` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFormat {
    Text,
    Json,
}

impl FromStr for SignalFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(AppError::Config(format!(
                "SIGNAL_FORMAT must be `text` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Forced-profit injection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedProfitConfig {
    pub enabled: bool,
    /// Consecutive losing signals that arm the injection.
    pub loss_streak: u32,
    /// Lift applied to the sell leg, as a fraction of the highest observed price.
    pub min_lift: f64,
    pub max_lift: f64,
}

impl Default for ForcedProfitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            loss_streak: 3,
            min_lift: 0.003,
            max_lift: 0.008,
        }
    }
}

/// Parameters of the detection engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// First (`X`) and second (`Y`) exchange ids.
    pub exchanges: (String, String),
    /// Minimum absolute spread, in percent.
    pub spread_threshold_pct: f64,
    pub execution_amount: f64,
    pub min_signal_interval: Duration,
    pub fee_rate: f64,
    pub forced_profit: ForcedProfitConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exchanges: ("binance".into(), "kraken".into()),
            spread_threshold_pct: 0.01,
            execution_amount: 0.01,
            min_signal_interval: Duration::from_secs(2),
            fee_rate: 0.001,
            forced_profit: ForcedProfitConfig::default(),
        }
    }
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Inbound feed bind address (`tcp://` or `ws://`).
    pub feed_bind: String,
    /// Pub/sub store URL.
    pub redis_url: String,
    pub engine: EngineConfig,
    pub metrics_interval: Duration,
    /// Execute every emitted signal on the simulated executor.
    pub auto_execute: bool,
    pub signal_format: SignalFormat,
    pub heartbeat_every_ticks: u64,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let feed_bind = get("FEED_BIND").unwrap_or_else(|| "tcp://0.0.0.0:5555".into());
        let redis_url = match get("REDIS_URL") {
            Some(url) => url,
            None => {
                let host = get("REDIS_HOST").unwrap_or_else(|| "localhost".into());
                let port: u16 = parse_or(&get, "REDIS_PORT", 6379)?;
                format!("redis://{host}:{port}")
            }
        };

        let exchanges = match get("EXCHANGES") {
            Some(raw) => parse_exchanges(&raw)?,
            None => ("binance".into(), "kraken".into()),
        };

        let defaults = ForcedProfitConfig::default();
        let forced_profit = ForcedProfitConfig {
            enabled: parse_bool_or(&get, "FORCED_PROFIT_ENABLED", defaults.enabled)?,
            loss_streak: parse_or(&get, "FORCED_PROFIT_LOSS_STREAK", defaults.loss_streak)?,
            ..defaults
        };

        let engine = EngineConfig {
            exchanges,
            spread_threshold_pct: parse_or(&get, "SPREAD_THRESHOLD", 0.01)?,
            execution_amount: parse_or(&get, "EXECUTION_AMOUNT", 0.01)?,
            min_signal_interval: secs(parse_or(&get, "MIN_SIGNAL_INTERVAL", 2.0)?, "MIN_SIGNAL_INTERVAL")?,
            fee_rate: parse_or(&get, "FEE_RATE", 0.001)?,
            forced_profit,
        };

        let config = Self {
            feed_bind,
            redis_url,
            engine,
            metrics_interval: secs(
                parse_or(&get, "METRICS_PUBLISH_INTERVAL", 1.0)?,
                "METRICS_PUBLISH_INTERVAL",
            )?,
            auto_execute: parse_bool_or(&get, "AUTO_EXECUTE", true)?,
            signal_format: match get("SIGNAL_FORMAT") {
                Some(raw) => raw.parse()?,
                None => SignalFormat::Text,
            },
            heartbeat_every_ticks: parse_or(&get, "HEARTBEAT_EVERY_TICKS", 30)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if !(engine.spread_threshold_pct >= 0.0) {
            return Err(AppError::Config("SPREAD_THRESHOLD must be >= 0".into()));
        }
        if !(engine.execution_amount > 0.0) {
            return Err(AppError::Config("EXECUTION_AMOUNT must be > 0".into()));
        }
        if !(0.0..1.0).contains(&engine.fee_rate) {
            return Err(AppError::Config("FEE_RATE must be in [0, 1)".into()));
        }
        if engine.min_signal_interval.is_zero() || self.metrics_interval.is_zero() {
            return Err(AppError::Config("intervals must be > 0".into()));
        }
        if engine.forced_profit.loss_streak == 0 {
            return Err(AppError::Config(
                "FORCED_PROFIT_LOSS_STREAK must be >= 1".into(),
            ));
        }
        let forced = &engine.forced_profit;
        if forced.enabled {
            // Smallest lift must clear both the threshold and the round-trip fees on flat books.
            if engine.spread_threshold_pct >= forced.min_lift * 100.0 {
                return Err(AppError::Config(format!(
                    "SPREAD_THRESHOLD must be < {}% while forced profit is enabled",
                    forced.min_lift * 100.0
                )));
            }
            if engine.fee_rate >= forced.min_lift / (2.0 + forced.min_lift) {
                return Err(AppError::Config(format!(
                    "FEE_RATE must be < {:.6} while forced profit is enabled",
                    forced.min_lift / (2.0 + forced.min_lift)
                )));
            }
        }
        if self.heartbeat_every_ticks == 0 {
            return Err(AppError::Config("HEARTBEAT_EVERY_TICKS must be >= 1".into()));
        }
        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}={raw}: {e}"))),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{key}={raw}: expected a boolean"))),
        },
        None => Ok(default),
    }
}

fn secs(value: f64, key: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| AppError::Config(format!("{key}={value}: {e}")))
}

fn parse_exchanges(raw: &str) -> Result<(String, String)> {
    let ids: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    match ids.as_slice() {
        [first, second] if first != second => Ok((first.clone(), second.clone())),
        _ => Err(AppError::Config(format!(
            "EXCHANGES must name exactly two distinct exchanges, got `{raw}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = load(&[]).unwrap();
        assert_eq!(config.feed_bind, "tcp://0.0.0.0:5555");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.metrics_interval, Duration::from_secs(1));
        assert!(config.auto_execute);
        assert_eq!(config.signal_format, SignalFormat::Text);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("REDIS_HOST", "redis"),
            ("EXCHANGES", "Coinbase, bitstamp"),
            ("SPREAD_THRESHOLD", "0.05"),
            ("MIN_SIGNAL_INTERVAL", "0.5"),
            ("FORCED_PROFIT_ENABLED", "false"),
            ("SIGNAL_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.redis_url, "redis://redis:6379");
        assert_eq!(
            config.engine.exchanges,
            ("coinbase".to_string(), "bitstamp".to_string())
        );
        assert_eq!(config.engine.spread_threshold_pct, 0.05);
        assert_eq!(config.engine.min_signal_interval, Duration::from_millis(500));
        assert!(!config.engine.forced_profit.enabled);
        assert_eq!(config.signal_format, SignalFormat::Json);

        let explicit = load(&[("REDIS_URL", "redis://cache:6380/0"), ("REDIS_HOST", "x")]).unwrap();
        assert_eq!(explicit.redis_url, "redis://cache:6380/0");
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for pairs in [
            vec![("EXCHANGES", "binance")],
            vec![("EXCHANGES", "binance,binance")],
            vec![("EXECUTION_AMOUNT", "0")],
            vec![("FEE_RATE", "1.5")],
            vec![("SPREAD_THRESHOLD", "abc")],
            vec![("MIN_SIGNAL_INTERVAL", "-1")],
            vec![("FORCED_PROFIT_LOSS_STREAK", "0")],
            vec![("AUTO_EXECUTE", "maybe")],
        ] {
            let err = load(&pairs).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{pairs:?} -> {err}");
        }
    }

    #[test]
    fn forced_profit_rejects_threshold_or_fees_above_the_lift() {
        for pairs in [
            vec![("SPREAD_THRESHOLD", "0.31")],
            vec![("SPREAD_THRESHOLD", "0.5")],
            vec![("FEE_RATE", "0.0015")],
            vec![("FEE_RATE", "0.002")],
        ] {
            let err = load(&pairs).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{pairs:?} -> {err}");

            let mut disabled = pairs.clone();
            disabled.push(("FORCED_PROFIT_ENABLED", "false"));
            assert!(load(&disabled).is_ok(), "{disabled:?}");
        }
        assert!(load(&[("SPREAD_THRESHOLD", "0.29"), ("FEE_RATE", "0.0014")]).is_ok());
    }
}
