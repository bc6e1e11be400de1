//! Sequential ingestion path: decode → passthrough → update/evaluate →
//! publish signals → optionally execute.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SignalFormat;
use crate::engine::{Engine, UpdateResult};
use crate::execution::{ExecutionOutcome, ExecutionRequest, SimulatedExecutor};
use crate::feed::FeedListener;
use crate::models::{PriceUpdate, SignalEvent};
use crate::publisher::{Channel, Publisher, publish_or_log};
use crate::utils;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Not JSON, or JSON that is not a quote object.
    Malformed,
    /// Unknown exchange or non-positive price.
    Ignored,
    Processed { signals: usize, executions: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub auto_execute: bool,
    pub signal_format: SignalFormat,
}

pub struct Pipeline {
    engine: Arc<Engine>,
    executor: SimulatedExecutor,
    publisher: Arc<dyn Publisher>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(engine: Arc<Engine>, publisher: Arc<dyn Publisher>, options: PipelineOptions) -> Self {
        let executor = SimulatedExecutor::new(engine.config().fee_rate);
        Self {
            engine,
            executor,
            publisher,
            options,
        }
    }

    /// Drain the feed one message at a time until it closes.
    pub async fn run(&self, feed: &mut FeedListener) {
        while let Some(raw) = feed.recv().await {
            self.handle_message(&raw).await;
        }
        warn!("[FEED] inbound queue closed, ingestion stopped");
    }

    pub async fn handle_message(&self, raw: &str) -> MessageOutcome {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "[FEED] undecodable message");
                return MessageOutcome::Malformed;
            }
        };

        // Republished before validation; the ingestion path does not wait on it.
        let publisher = Arc::clone(&self.publisher);
        let passthrough = value.to_string();
        tokio::spawn(async move {
            publish_or_log(publisher.as_ref(), Channel::PriceUpdates, passthrough).await;
        });

        let update = match PriceUpdate::from_value(value) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "[FEED] message is not a quote");
                return MessageOutcome::Malformed;
            }
        };

        let result = self
            .engine
            .apply_update(&update, utils::now_ms_f64(), &mut rand::thread_rng());

        let signals = match result {
            UpdateResult::Accepted { signals, .. } => signals,
            rejected => {
                debug!(exchange = ?update.exchange, ?rejected, "[FEED] update ignored");
                return MessageOutcome::Ignored;
            }
        };

        let mut executions = 0;
        for signal in &signals {
            self.publish_signal(signal).await;
            if self.options.auto_execute && self.execute_signal(signal).await {
                executions += 1;
            }
        }

        MessageOutcome::Processed {
            signals: signals.len(),
            executions,
        }
    }

    async fn publish_signal(&self, signal: &SignalEvent) {
        let text = signal.to_text();
        if signal.estimated_net_profit > 0.0 {
            info!(forced = signal.forced, "[SIGNAL] profitable: {text}");
        } else {
            info!("[SIGNAL] losing: {text}");
        }

        let payload = match self.options.signal_format {
            SignalFormat::Text => text,
            SignalFormat::Json => match serde_json::to_string(signal) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "[SIGNAL] failed to serialize signal");
                    return;
                }
            },
        };
        publish_or_log(self.publisher.as_ref(), Channel::ArbitrageSignals, payload).await;
    }

    /// Returns whether the execution was accepted.
    async fn execute_signal(&self, signal: &SignalEvent) -> bool {
        let request = ExecutionRequest {
            buy_exchange: signal.buy_exchange.clone(),
            sell_exchange: signal.sell_exchange.clone(),
            buy_price: signal.buy_price,
            sell_price: signal.sell_price,
            amount: self.engine.config().execution_amount,
        };

        let record = match self.executor.execute(request).await {
            ExecutionOutcome::Executed(record) => record,
            ExecutionOutcome::Rejected {
                buy_price,
                sell_price,
            } => {
                debug!(buy_price, sell_price, "[EXEC] rejected: sell <= buy");
                return false;
            }
        };

        self.engine.record_execution(&record);
        info!(
            id = %record.id,
            net_profit = record.net_profit,
            profit_pct = record.profit_pct,
            execution_time_ms = record.execution_time_ms,
            "[EXEC] {} {} -> {} {}",
            record.buy_exchange,
            utils::format_usd(record.buy_price),
            record.sell_exchange,
            utils::format_usd(record.sell_price),
        );

        match serde_json::to_string(&record) {
            Ok(payload) => {
                publish_or_log(self.publisher.as_ref(), Channel::ExecutedOrders, payload).await;
            }
            Err(e) => warn!(error = %e, "[EXEC] failed to serialize record"),
        }
        true
    }
}
