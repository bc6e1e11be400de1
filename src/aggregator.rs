//! Periodic performance-metrics publishing.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::models::MetricsSnapshot;
use crate::publisher::{Channel, Publisher, publish_or_log};

pub struct MetricsAggregator {
    engine: Arc<Engine>,
    publisher: Arc<dyn Publisher>,
    interval: Duration,
    heartbeat_every_ticks: u64,
}

impl MetricsAggregator {
    pub fn new(
        engine: Arc<Engine>,
        publisher: Arc<dyn Publisher>,
        interval: Duration,
        heartbeat_every_ticks: u64,
    ) -> Self {
        Self {
            engine,
            publisher,
            interval,
            heartbeat_every_ticks: heartbeat_every_ticks.max(1),
        }
    }

    /// Snapshot and publish once. Skips silently while no latency has been seen.
    pub async fn tick(&self) -> Option<MetricsSnapshot> {
        let snapshot = self.engine.snapshot()?;
        match serde_json::to_string(&snapshot) {
            Ok(payload) => {
                publish_or_log(self.publisher.as_ref(), Channel::PerformanceMetrics, payload).await;
            }
            Err(e) => warn!(error = %e, "[METRICS] failed to serialize snapshot"),
        }
        Some(snapshot)
    }

    /// Period ticker. A stalled tick pushes the schedule back instead of bursting.
    fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Spawn the fixed-period publishing loop.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = self.ticker();
            // first tick of `interval` completes immediately
            ticker.tick().await;
            let mut ticks: u64 = 0;

            loop {
                ticker.tick().await;
                ticks += 1;

                let published = self.tick().await;
                if ticks % self.heartbeat_every_ticks == 0 {
                    let counters = self.engine.counters();
                    match published {
                        Some(snapshot) => info!(
                            avg_latency_ms = snapshot.avg_latency_ms,
                            messages = counters.messages_processed,
                            opportunities = counters.opportunities_total,
                            orders = counters.orders_total,
                            profit = counters.profit_simulated_total,
                            "[HEARTBEAT] engine running"
                        ),
                        None => info!("[HEARTBEAT] waiting for quotes"),
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::PriceUpdate;
    use crate::publisher::memory::MemoryPublisher;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const NOW: f64 = 1_700_000_000_000.0;

    fn feed(engine: &Engine, latency_ms: i64) {
        let update = PriceUpdate {
            exchange: Some("binance".into()),
            bid: 99.0,
            ask: 100.0,
            timestamp: Some(NOW as i64 - latency_ms),
        };
        engine.apply_update(&update, NOW, &mut StdRng::seed_from_u64(3));
    }

    fn aggregator(engine: &Arc<Engine>, publisher: &Arc<MemoryPublisher>) -> MetricsAggregator {
        MetricsAggregator::new(
            Arc::clone(engine),
            Arc::clone(publisher) as Arc<dyn Publisher>,
            Duration::from_millis(10),
            1,
        )
    }

    #[tokio::test]
    async fn empty_window_publishes_nothing() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let publisher = Arc::new(MemoryPublisher::default());
        let metrics = aggregator(&engine, &publisher);

        assert!(metrics.tick().await.is_none());
        assert!(publisher.all().is_empty());
    }

    #[tokio::test]
    async fn one_snapshot_per_non_empty_tick() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let publisher = Arc::new(MemoryPublisher::default());
        let metrics = aggregator(&engine, &publisher);
        feed(&engine, 4);
        feed(&engine, 8);

        let snapshot = metrics.tick().await.unwrap();
        assert_eq!(snapshot.avg_latency_ms, 6.0);
        assert_eq!(snapshot.last_latency_ms, 8.0);
        metrics.tick().await;

        let published = publisher.messages(Channel::PerformanceMetrics);
        assert_eq!(published.len(), 2);
        let json: serde_json::Value = serde_json::from_str(&published[0]).unwrap();
        assert_eq!(json["avg_latency_ms"], 6.0);
        assert_eq!(json["messages_processed"], 2);
        assert_eq!(json["total_orders"], 0);
    }

    #[tokio::test]
    async fn publish_failure_is_tolerated() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let publisher = Arc::new(MemoryPublisher::failing());
        let metrics = aggregator(&engine, &publisher);
        feed(&engine, 5);

        assert!(metrics.tick().await.is_some());
        assert!(metrics.tick().await.is_some());
    }

    #[tokio::test]
    async fn missed_ticks_are_delayed_not_burst() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let publisher = Arc::new(MemoryPublisher::default());
        let ticker = aggregator(&engine, &publisher).ticker();
        assert_eq!(ticker.missed_tick_behavior(), MissedTickBehavior::Delay);
        assert_eq!(ticker.period(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn spawned_loop_keeps_publishing() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let publisher = Arc::new(MemoryPublisher::default());
        feed(&engine, 1);

        let handle = aggregator(&engine, &publisher).spawn();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(publisher.messages(Channel::PerformanceMetrics).len() >= 2);
    }
}
