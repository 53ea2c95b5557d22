// 6.0: order-book snapshot. resting quantity per (symbol, side, price),
// written only by the feed consumer, read-only to the engine.
// a depth update with quantity 0 removes the row.

use crate::types::BookSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolBook {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl SymbolBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert one depth row; zero or negative quantity removes it.
    pub fn apply(&mut self, side: BookSide, price: Decimal, quantity: Decimal) {
        let levels = match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        };
        if quantity <= Decimal::ZERO {
            levels.remove(&price);
        } else {
            levels.insert(price, quantity);
        }
    }

    /// Up to `max_levels` price levels, best first: asks ascending, bids descending.
    pub fn levels(&self, side: BookSide, max_levels: usize) -> Vec<(Decimal, Decimal)> {
        match side {
            BookSide::Ask => self
                .asks
                .iter()
                .take(max_levels)
                .map(|(p, q)| (*p, *q))
                .collect(),
            BookSide::Bid => self
                .bids
                .iter()
                .rev()
                .take(max_levels)
                .map(|(p, q)| (*p, *q))
                .collect(),
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Bid/ask midpoint, the mark price for liquidation checks.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
