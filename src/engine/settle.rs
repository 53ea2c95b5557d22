//! Shared settlement: the one place fills become positions, balances and
//! trades. Both the market path and the limit matcher land here, inside a
//! transaction the caller commits or rolls back as a whole.

use super::results::EngineError;
use super::Engine;
use crate::margin::{clamp_isolated_loss, liquidation_price, required_margin};
use crate::position::Position;
use crate::store::LedgerTx;
use crate::types::{OrderId, OrderType, Timestamp};
use rust_decimal::Decimal;

impl Engine {
    /// Settle a fill of `fill_qty` at `fill_price` for `order_id`.
    ///
    /// 1. the order is marked filled;
    /// 2. a LIMIT order's reservation is released in full (the residual
    ///    below re-reserves exactly what it needs, so a netted portion's
    ///    excess flows back to available);
    /// 3. an opposite OPEN position is netted first, realizing clamped pnl;
    /// 4. any residual opens or extends the same-side position;
    /// 5. trade rows are appended for the close and/or the open.
    ///
    /// Any error leaves the transaction for the caller to roll back; an
    /// order never ends FILLED without its account and position effects.
    pub(super) fn settle_fill(
        &self,
        tx: &mut LedgerTx,
        order_id: OrderId,
        fill_qty: Decimal,
        fill_price: Decimal,
    ) -> Result<(), EngineError> {
        let now = Timestamp::now();
        let order = tx.order(order_id)?.clone();

        tx.order_mut(order_id)?.record_fill(fill_qty, fill_price, now);

        if order.order_type == OrderType::Limit && order.reserved_margin > Decimal::ZERO {
            tx.account_mut(order.account_id)?
                .release_margin(order.reserved_margin, now);
            tx.order_mut(order_id)?.reserved_margin = Decimal::ZERO;
        }

        // Netting: close opposite exposure before opening any.
        let mut remaining = fill_qty;
        let mut close_trade = None;
        if let Some(pos) = tx
            .open_position(order.account_id, &order.symbol, order.side.closes())
            .cloned()
        {
            let close_qty = remaining.min(pos.quantity);
            let raw_pnl = (fill_price - pos.entry_price) * close_qty * pos.side.sign();

            let released = tx.position_mut(pos.id)?.reduce(close_qty, now);
            let pnl = clamp_isolated_loss(raw_pnl, released);
            tx.account_mut(order.account_id)?.apply_close(released, pnl, now);

            remaining -= close_qty;
            close_trade = Some((close_qty, pnl));
        }

        // Residual opens or extends the same side.
        let mut open_trade = None;
        if remaining > Decimal::ZERO {
            let new_margin = required_margin(fill_price, remaining, order.leverage);
            tx.account_mut(order.account_id)?
                .reserve_margin(new_margin, now)?;

            let open_side = order.side.opens();
            match tx
                .open_position(order.account_id, &order.symbol, open_side)
                .map(|p| p.id)
            {
                Some(pos_id) => {
                    tx.position_mut(pos_id)?
                        .extend(remaining, fill_price, new_margin, now);
                }
                None => {
                    let notional = fill_price * remaining;
                    let mmr = tx.maint_margin_rate(
                        &order.symbol,
                        notional,
                        self.config.default_maint_margin_rate,
                    );
                    let liq = liquidation_price(fill_price, order.leverage, open_side, mmr);
                    let id = tx.next_position_id();
                    tx.insert_position(Position::open(
                        id,
                        order.account_id,
                        order.symbol.clone(),
                        open_side,
                        remaining,
                        fill_price,
                        order.leverage,
                        new_margin,
                        Some(liq),
                        now,
                    ));
                }
            }
            open_trade = Some(remaining);
        }

        if let Some((qty, pnl)) = close_trade {
            tx.record_trade(
                Some(order_id),
                order.account_id,
                order.symbol.clone(),
                order.side,
                qty,
                fill_price,
                pnl,
                now,
            );
        }
        if let Some(qty) = open_trade {
            tx.record_trade(
                Some(order_id),
                order.account_id,
                order.symbol.clone(),
                order.side,
                qty,
                fill_price,
                Decimal::ZERO,
                now,
            );
        }

        debug_assert!(tx
            .account(order.account_id)
            .map(|a| a.balanced())
            .unwrap_or(false));

        Ok(())
    }
}
