use rand::Rng;
use tracing::info;

use super::types::{PriceView, ThrottleState, TradePnl};
use crate::config::EngineConfig;
use crate::engine::OrderBookStore;
use crate::models::{SignalEvent, TradeDirection};

/// Bidirectional cross-exchange spread evaluation with signal throttling.
#[derive(Debug, Clone)]
pub struct SpreadEvaluator {
    config: EngineConfig,
}

impl SpreadEvaluator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate both directions against the current book.
    ///
    /// Mutates `throttle` and bumps `opportunities_total` for every emitted
    /// signal. Direction A is checked before Direction B, so a non-forced
    /// emission on A restarts the cooldown seen by B.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        book: &OrderBookStore,
        throttle: &mut ThrottleState,
        opportunities_total: &mut u64,
        now_ms: f64,
        rng: &mut R,
    ) -> Vec<SignalEvent> {
        let (first, second) = &self.config.exchanges;
        let (Some(first_quote), Some(second_quote)) = (book.get(first), book.get(second)) else {
            return Vec::new();
        };

        let mut view = PriceView {
            first_bid: first_quote.bid,
            first_ask: first_quote.ask,
            second_bid: second_quote.bid,
            second_ask: second_quote.ask,
        };

        let forced = self.config.forced_profit.enabled
            && throttle.consecutive_losses >= self.config.forced_profit.loss_streak;
        let mut lifted = None;
        if forced {
            lifted = Some(self.lift_one_leg(&mut view, rng));
            throttle.consecutive_losses = 0;
            info!(
                direction = ?lifted,
                "[SIGNAL] forcing a profitable spread after repeated losses"
            );
        }

        let mut signals = Vec::new();

        // Direction A: buy first @ ask -> sell second @ bid
        if let Some(signal) = self.evaluate_direction(
            TradeDirection::FirstToSecond,
            view.first_ask,
            view.second_bid,
            forced,
            lifted == Some(TradeDirection::FirstToSecond),
            throttle,
            now_ms,
        ) {
            signals.push(signal);
        }

        // Direction B: buy second @ ask -> sell first @ bid
        if let Some(signal) = self.evaluate_direction(
            TradeDirection::SecondToFirst,
            view.second_ask,
            view.first_bid,
            forced,
            lifted == Some(TradeDirection::SecondToFirst),
            throttle,
            now_ms,
        ) {
            signals.push(signal);
        }

        *opportunities_total += signals.len() as u64;
        signals
    }

    /// Raise the sell-side bid of a randomly chosen direction above its buy ask.
    fn lift_one_leg<R: Rng + ?Sized>(&self, view: &mut PriceView, rng: &mut R) -> TradeDirection {
        let forced = &self.config.forced_profit;
        let lift = if forced.max_lift > forced.min_lift {
            rng.gen_range(forced.min_lift..forced.max_lift)
        } else {
            forced.min_lift
        };
        let adjustment = view.max_price() * lift;
        if rng.gen_bool(0.5) {
            view.second_bid = view.first_ask + adjustment;
            TradeDirection::FirstToSecond
        } else {
            view.first_bid = view.second_ask + adjustment;
            TradeDirection::SecondToFirst
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_direction(
        &self,
        direction: TradeDirection,
        buy_price: f64,
        sell_price: f64,
        skip_cooldown: bool,
        lifted: bool,
        throttle: &mut ThrottleState,
        now_ms: f64,
    ) -> Option<SignalEvent> {
        if !(buy_price > 0.0 && sell_price > 0.0) {
            return None;
        }

        let spread_pct = (sell_price - buy_price) / buy_price * 100.0;
        if spread_pct.abs() <= self.config.spread_threshold_pct {
            return None;
        }
        let min_interval_ms = self.config.min_signal_interval.as_secs_f64() * 1_000.0;
        if !skip_cooldown && !throttle.interval_elapsed(now_ms, min_interval_ms) {
            return None;
        }

        let pnl = TradePnl::compute(
            buy_price,
            sell_price,
            self.config.execution_amount,
            self.config.fee_rate,
        );

        throttle.last_signal_at = Some(now_ms);
        // Only the forced path resets the streak; a profitable signal leaves it as is.
        if pnl.net_profit <= 0.0 {
            throttle.consecutive_losses += 1;
        }

        let (first, second) = &self.config.exchanges;
        let (buy_exchange, sell_exchange) = match direction {
            TradeDirection::FirstToSecond => (first.clone(), second.clone()),
            TradeDirection::SecondToFirst => (second.clone(), first.clone()),
        };

        Some(SignalEvent {
            buy_exchange,
            sell_exchange,
            buy_price,
            sell_price,
            spread_pct,
            estimated_net_profit: pnl.net_profit,
            forced: lifted,
            timestamp: now_ms as i64,
        })
    }
}
