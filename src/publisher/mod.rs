//! Outbound pub/sub publishing.
//!
//! Delivery is at-most-once: failures are logged by [`publish_or_log`] and
//! never retried.

use std::fmt;

use async_trait::async_trait;
use tracing::warn;

use crate::errors::Result;

#[cfg(test)]
pub(crate) mod memory;
pub mod redis_publisher;

pub use redis_publisher::RedisPublisher;

/// Logical outbound channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    PriceUpdates,
    ArbitrageSignals,
    ExecutedOrders,
    PerformanceMetrics,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::PriceUpdates => "price-updates",
            Channel::ArbitrageSignals => "arbitrage-signals",
            Channel::ExecutedOrders => "executed-orders",
            Channel::PerformanceMetrics => "performance-metrics",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, channel: Channel, payload: String) -> Result<()>;
}

/// Publish and swallow any failure with a warning.
///
/// Returns whether the publish succeeded.
pub async fn publish_or_log(publisher: &dyn Publisher, channel: Channel, payload: String) -> bool {
    match publisher.publish(channel, payload).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%channel, error = %e, "[PUBLISH] dropped message");
            false
        }
    }
}
