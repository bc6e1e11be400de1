//! Core library for the arbitrage-sniper engine.
//!
//! Quotes arrive on the [`feed`], flow through the [`pipeline`] into the
//! shared [`engine`], and signals, simulated executions and metrics leave
//! through a [`publisher`].

pub mod aggregator;
pub mod arbitrage;
pub mod config;
pub mod engine;
pub mod errors;
pub mod execution;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod utils;
