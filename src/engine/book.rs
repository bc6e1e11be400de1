use std::collections::HashMap;

use crate::models::ExchangeQuote;

/// Result of applying a quote to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookUpdate {
    Applied,
    UnknownExchange,
    /// bid or ask was not strictly positive.
    InvalidPrice,
}

/// Latest best bid/ask per known exchange.
///
/// The set of exchanges is fixed at construction; updates for other ids are
/// rejected rather than creating new entries.
#[derive(Debug, Clone)]
pub struct OrderBookStore {
    quotes: HashMap<String, ExchangeQuote>,
}

impl OrderBookStore {
    pub fn new<I, S>(exchange_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let quotes = exchange_ids
            .into_iter()
            .map(|id| {
                let id = id.into();
                (id.clone(), ExchangeQuote::empty(id))
            })
            .collect();
        Self { quotes }
    }

    /// Overwrite the quote for `exchange_id` when both prices are positive.
    pub fn update(&mut self, exchange_id: &str, bid: f64, ask: f64, observed_at: i64) -> BookUpdate {
        let Some(quote) = self.quotes.get_mut(exchange_id) else {
            return BookUpdate::UnknownExchange;
        };
        // NaN fails both comparisons as well.
        if !(bid > 0.0 && ask > 0.0) {
            return BookUpdate::InvalidPrice;
        }
        quote.bid = bid;
        quote.ask = ask;
        quote.observed_at = observed_at;
        BookUpdate::Applied
    }

    pub fn get(&self, exchange_id: &str) -> Option<&ExchangeQuote> {
        self.quotes.get(exchange_id)
    }

    pub fn is_known(&self, exchange_id: &str) -> bool {
        self.quotes.contains_key(exchange_id)
    }
}
