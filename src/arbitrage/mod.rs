//! Cross-exchange spread detection.

pub mod evaluator;
pub mod types;

pub use evaluator::SpreadEvaluator;
pub use types::{PriceView, ThrottleState, TradePnl};
