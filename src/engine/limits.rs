//! Opportunistic limit matching against trade prints.

use super::results::MatchSummary;
use super::Engine;
use crate::types::{OrderId, Symbol};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{debug, error};

impl Engine {
    /// Settle every PENDING limit order on `symbol` crossed by a trade
    /// print at `trade_price`: BUY orders priced at or above it, SELL
    /// orders at or below it.
    ///
    /// Orders are claimed one at a time with skip-if-held semantics and
    /// each settles in its own transaction at its own limit price (full
    /// fill, no price improvement). Concurrent matchers racing over the
    /// same print settle each order exactly once: whichever transaction
    /// commits first flips the order off PENDING and the loser's claim
    /// pass skips it. A failed settlement rolls back, is logged, and the
    /// remaining orders still settle.
    pub async fn match_limits(&self, symbol: &Symbol, trade_price: Decimal) -> MatchSummary {
        let mut summary = MatchSummary::default();
        let mut skip: HashSet<OrderId> = HashSet::new();

        loop {
            let mut tx = self.ledger.begin().await;
            let Some(order) = tx.claim_next_crossed(symbol, trade_price, &skip) else {
                break;
            };
            let Some(limit_price) = order.price else {
                // A PENDING limit row without a price cannot settle; leave it.
                skip.insert(order.id);
                summary.failed += 1;
                continue;
            };

            match self.settle_fill(&mut tx, order.id, order.quantity, limit_price) {
                Ok(()) => {
                    tx.commit();
                    summary.settled += 1;
                    debug!(order_id = order.id.0, price = %limit_price, "limit order filled");
                }
                Err(err) => {
                    tx.rollback();
                    skip.insert(order.id);
                    summary.failed += 1;
                    error!(order_id = order.id.0, error = %err, "limit settlement failed");
                }
            }
        }

        summary
    }
}
