//! Market sweep: fill a market order against resting depth.

use super::results::SweepResult;
use super::Engine;
use crate::store::LedgerTx;
use crate::types::{BookSide, OrderSide, Symbol};
use rust_decimal::Decimal;
use tracing::debug;

impl Engine {
    /// Simulate a market execution against the current book, slippage
    /// included. Reads only; callers settle the result themselves.
    pub async fn execute_market(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Decimal,
    ) -> SweepResult {
        let tx = self.ledger.begin().await;
        let result = self.sweep_book(&tx, symbol, side, quantity);
        tx.rollback();
        result
    }

    /// Walk up to `max_sweep_levels` of the opposite book side best-first:
    /// a BUY consumes asks ascending, a SELL consumes bids descending. Each
    /// level contributes `min(remaining, level_qty)`.
    pub(super) fn sweep_book(
        &self,
        tx: &LedgerTx,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Decimal,
    ) -> SweepResult {
        let book_side = match side {
            OrderSide::Buy => BookSide::Ask,
            OrderSide::Sell => BookSide::Bid,
        };

        let levels = tx
            .book(symbol)
            .map(|book| book.levels(book_side, self.config.max_sweep_levels))
            .unwrap_or_default();

        if levels.is_empty() {
            debug!(%symbol, ?side, "no liquidity for market sweep");
            return SweepResult::zero();
        }

        let mut remaining = quantity;
        let mut filled_qty = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;

        for (price, level_qty) in levels {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(level_qty);
            total_cost += price * take;
            filled_qty += take;
            remaining -= take;
        }

        let avg_price = if filled_qty > Decimal::ZERO {
            total_cost / filled_qty
        } else {
            Decimal::ZERO
        };

        SweepResult {
            avg_price,
            filled_qty,
            total_cost,
        }
    }
}
