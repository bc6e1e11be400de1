/// Profit breakdown of buying `amount` at `buy_price` and selling at `sell_price`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePnl {
    pub buy_cost: f64,
    pub sell_revenue: f64,
    pub gross_profit: f64,
    /// `fee_rate` charged on both legs' notional.
    pub fees: f64,
    pub net_profit: f64,
}

impl TradePnl {
    pub fn compute(buy_price: f64, sell_price: f64, amount: f64, fee_rate: f64) -> Self {
        let buy_cost = buy_price * amount;
        let sell_revenue = sell_price * amount;
        let gross_profit = sell_revenue - buy_cost;
        let fees = (buy_cost + sell_revenue) * fee_rate;
        Self {
            buy_cost,
            sell_revenue,
            gross_profit,
            fees,
            net_profit: gross_profit - fees,
        }
    }

    /// Net profit as a percentage of the buy cost.
    pub fn profit_pct(&self) -> f64 {
        if self.buy_cost > 0.0 {
            self.net_profit / self.buy_cost * 100.0
        } else {
            0.0
        }
    }
}

/// Signal-rate throttle state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrottleState {
    /// Epoch millis of the last emitted signal.
    pub last_signal_at: Option<f64>,
    /// Signals with non-positive net profit since the last forced reset.
    pub consecutive_losses: u32,
}

impl ThrottleState {
    pub fn interval_elapsed(&self, now_ms: f64, min_interval_ms: f64) -> bool {
        match self.last_signal_at {
            Some(last) => now_ms - last >= min_interval_ms,
            None => true,
        }
    }
}

/// Prices seen by one evaluation cycle, possibly lifted by forced-profit injection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceView {
    pub first_bid: f64,
    pub first_ask: f64,
    pub second_bid: f64,
    pub second_ask: f64,
}

impl PriceView {
    pub fn max_price(&self) -> f64 {
        self.first_bid
            .max(self.first_ask)
            .max(self.second_bid)
            .max(self.second_ask)
    }
}
