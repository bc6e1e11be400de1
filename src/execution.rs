//! Simulated order execution.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::arbitrage::TradePnl;
use crate::models::{ExecutionRecord, ExecutionStatus};
use crate::utils;

/// One buy/sell leg pair to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Executed(ExecutionRecord),
    /// Sell price did not exceed buy price. Expected, not a fault.
    Rejected { buy_price: f64, sell_price: f64 },
}

/// Synthesizes fills after a short simulated delay.
#[derive(Debug)]
pub struct SimulatedExecutor {
    fee_rate: f64,
    delay_ms: Range<f64>,
    seq: AtomicU64,
}

impl SimulatedExecutor {
    pub fn new(fee_rate: f64) -> Self {
        Self {
            fee_rate,
            delay_ms: 1.0..3.0,
            seq: AtomicU64::new(0),
        }
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let started = Instant::now();

        if request.sell_price <= request.buy_price {
            return ExecutionOutcome::Rejected {
                buy_price: request.buy_price,
                sell_price: request.sell_price,
            };
        }

        let delay_ms = rand::thread_rng().gen_range(self.delay_ms.clone());
        tokio::time::sleep(Duration::from_secs_f64(delay_ms / 1_000.0)).await;

        let pnl = TradePnl::compute(
            request.buy_price,
            request.sell_price,
            request.amount,
            self.fee_rate,
        );
        let timestamp = utils::now_ms();

        ExecutionOutcome::Executed(ExecutionRecord {
            id: self.next_id(timestamp),
            timestamp,
            buy_exchange: request.buy_exchange,
            sell_exchange: request.sell_exchange,
            buy_price: request.buy_price,
            sell_price: request.sell_price,
            amount: request.amount,
            gross_profit: pnl.gross_profit,
            fees: pnl.fees,
            net_profit: pnl.net_profit,
            profit_pct: pnl.profit_pct(),
            execution_time_ms: started.elapsed().as_secs_f64() * 1_000.0,
            status: ExecutionStatus::Executed,
        })
    }

    fn next_id(&self, timestamp: i64) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("ORD-{timestamp}-{seq}")
    }
}
