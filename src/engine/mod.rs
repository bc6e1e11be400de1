//! In-memory arbitrage engine state.
//!
//! All mutable state lives in a single [`EngineState`] behind one mutex.
//! Every operation takes the lock once, does only CPU work, and releases it
//! before the caller awaits anything.

use parking_lot::Mutex;
use rand::Rng;

use crate::arbitrage::{SpreadEvaluator, ThrottleState};
use crate::config::EngineConfig;
use crate::models::{ExchangeQuote, ExecutionRecord, MetricsSnapshot, PriceUpdate, SignalEvent};
use crate::utils::round_to;

pub mod book;
pub mod latency;

pub use book::{BookUpdate, OrderBookStore};
pub use latency::{LATENCY_WINDOW, LatencyTracker};

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counters {
    pub opportunities_total: u64,
    pub orders_total: u64,
    pub profit_simulated_total: f64,
    pub messages_processed: u64,
}

#[derive(Debug, Clone)]
pub struct EngineState {
    pub book: OrderBookStore,
    pub latency: LatencyTracker,
    pub throttle: ThrottleState,
    pub counters: Counters,
}

/// Outcome of feeding one decoded update to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    UnknownExchange,
    InvalidPrice,
    Accepted {
        latency_ms: f64,
        signals: Vec<SignalEvent>,
    },
}

pub struct Engine {
    evaluator: SpreadEvaluator,
    state: Mutex<EngineState>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let (first, second) = &config.exchanges;
        let state = EngineState {
            book: OrderBookStore::new([first.clone(), second.clone()]),
            latency: LatencyTracker::default(),
            throttle: ThrottleState::default(),
            counters: Counters::default(),
        };
        Self {
            evaluator: SpreadEvaluator::new(config),
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.evaluator.config()
    }

    /// Apply a quote, record its latency and run spread evaluation.
    ///
    /// `now_ms` is wall-clock epoch millis with sub-millisecond precision.
    pub fn apply_update<R: Rng + ?Sized>(
        &self,
        update: &PriceUpdate,
        now_ms: f64,
        rng: &mut R,
    ) -> UpdateResult {
        let Some(exchange) = update.exchange.as_deref() else {
            return UpdateResult::UnknownExchange;
        };
        let timestamp = update.timestamp.unwrap_or(0);

        let mut guard = self.state.lock();
        let state = &mut *guard;

        match state.book.update(exchange, update.bid, update.ask, timestamp) {
            BookUpdate::UnknownExchange => return UpdateResult::UnknownExchange,
            BookUpdate::InvalidPrice => return UpdateResult::InvalidPrice,
            BookUpdate::Applied => {}
        }
        state.counters.messages_processed += 1;

        let latency_ms = if timestamp != 0 {
            round_to(now_ms - timestamp as f64, 2)
        } else {
            0.0
        };
        state.latency.record(latency_ms);

        let signals = self.evaluator.evaluate(
            &state.book,
            &mut state.throttle,
            &mut state.counters.opportunities_total,
            now_ms,
            rng,
        );

        UpdateResult::Accepted {
            latency_ms,
            signals,
        }
    }

    /// Account for one accepted execution.
    pub fn record_execution(&self, record: &ExecutionRecord) {
        let mut state = self.state.lock();
        state.counters.orders_total += 1;
        state.counters.profit_simulated_total += record.net_profit;
    }

    /// Consistent metrics view; `None` while no latency has been observed.
    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        let state = self.state.lock();
        let avg_latency_ms = state.latency.mean()?;
        Some(MetricsSnapshot {
            avg_latency_ms,
            last_latency_ms: state.latency.last().unwrap_or(0.0),
            opportunities_total: state.counters.opportunities_total,
            orders_total: state.counters.orders_total,
            profit_total: state.counters.profit_simulated_total,
            messages_processed: state.counters.messages_processed,
        })
    }

    pub fn counters(&self) -> Counters {
        self.state.lock().counters
    }

    pub fn quote(&self, exchange_id: &str) -> Option<ExchangeQuote> {
        self.state.lock().book.get(exchange_id).cloned()
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.state.lock().throttle.consecutive_losses
    }
}
