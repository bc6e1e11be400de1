//! Inbound quote feed.
//!
//! Responsibilities:
//! • Bind the configured endpoint and accept any number of pushers.
//! • Fan every text message into one bounded queue, in arrival order per connection.
//! • Survive broken connections and undecodable frames.

pub mod listener;

pub use listener::{FeedEndpoint, FeedListener};
