use std::sync::Arc;

use anyhow::Result;
use arbitrage_sniper::{
    aggregator::MetricsAggregator,
    config::AppConfig,
    engine::Engine,
    feed::FeedListener,
    pipeline::{Pipeline, PipelineOptions},
    publisher::{Publisher, RedisPublisher},
    utils,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    let engine_cfg = &config.engine;
    tracing::info!(
        exchanges = ?engine_cfg.exchanges,
        spread_threshold_pct = engine_cfg.spread_threshold_pct,
        execution_amount = engine_cfg.execution_amount,
        min_signal_interval_s = engine_cfg.min_signal_interval.as_secs_f64(),
        fee_rate = engine_cfg.fee_rate,
        forced_profit = engine_cfg.forced_profit.enabled,
        auto_execute = config.auto_execute,
        "[INIT] arbitrage-sniper starting"
    );

    // Transport initialization failures are fatal
    let publisher: Arc<dyn Publisher> = Arc::new(RedisPublisher::connect(&config.redis_url).await?);
    let mut feed = FeedListener::bind(&config.feed_bind).await?;

    let engine = Arc::new(Engine::new(config.engine.clone()));

    let metrics_task = MetricsAggregator::new(
        Arc::clone(&engine),
        Arc::clone(&publisher),
        config.metrics_interval,
        config.heartbeat_every_ticks,
    )
    .spawn();
    tracing::info!(
        interval_s = config.metrics_interval.as_secs_f64(),
        "[INIT] metrics aggregator started"
    );

    let pipeline = Pipeline::new(
        engine,
        publisher,
        PipelineOptions {
            auto_execute: config.auto_execute,
            signal_format: config.signal_format,
        },
    );
    tracing::info!("[INIT] engine ready, waiting for quotes");

    tokio::select! {
        _ = pipeline.run(&mut feed) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("[SHUTDOWN] interrupt received");
        }
    }

    metrics_task.abort();
    Ok(())
}
