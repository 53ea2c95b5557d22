// 4.0: open position tracking. pnl = (mark - entry) * qty * direction.
// one OPEN row per (account, symbol, side); netting closes the opposite
// side before the same side is opened or extended.

use crate::types::{
    AccountId, Leverage, PositionId, PositionSide, PositionStatus, Symbol, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub quantity: Decimal,
    /// Fill-quantity-weighted average entry price.
    pub entry_price: Decimal,
    pub leverage: Leverage,
    /// Isolated margin pledged to this position. Losses cannot exceed it.
    pub margin: Decimal,
    pub liquidation_price: Option<Decimal>,
    pub status: PositionStatus,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: PositionId,
        account_id: AccountId,
        symbol: Symbol,
        side: PositionSide,
        quantity: Decimal,
        entry_price: Decimal,
        leverage: Leverage,
        margin: Decimal,
        liquidation_price: Option<Decimal>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            account_id,
            symbol,
            side,
            quantity,
            entry_price,
            leverage,
            margin,
            liquidation_price,
            status: PositionStatus::Open,
            opened_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    // 4.1: same-side extension. entry averages, margin accrues.
    // liquidation price is set at open time and not recomputed here.
    pub fn extend(&mut self, quantity: Decimal, fill_price: Decimal, added_margin: Decimal, now: Timestamp) {
        self.entry_price = weighted_entry(self.quantity, self.entry_price, quantity, fill_price);
        self.quantity += quantity;
        self.margin += added_margin;
        self.updated_at = now;
    }

    /// Margin released when `close_qty` of this position is netted away.
    pub fn released_for(&self, close_qty: Decimal) -> Decimal {
        if close_qty >= self.quantity {
            self.margin
        } else {
            self.margin * close_qty / self.quantity
        }
    }

    // 4.2: netting close. proportional margin comes off; zero quantity closes the row.
    pub fn reduce(&mut self, close_qty: Decimal, now: Timestamp) -> Decimal {
        let released = self.released_for(close_qty);
        if close_qty >= self.quantity {
            self.quantity = Decimal::ZERO;
            self.margin = Decimal::ZERO;
            self.status = PositionStatus::Closed;
            self.closed_at = Some(now);
        } else {
            self.quantity -= close_qty;
            self.margin -= released;
        }
        self.updated_at = now;
        released
    }

    pub fn unrealized_pnl(&self, mark_price: Decimal) -> Decimal {
        (mark_price - self.entry_price) * self.quantity * self.side.sign()
    }

    /// Breach test against the mark price: LONG liquidates at or below its
    /// liquidation price, SHORT at or above.
    pub fn is_breached(&self, mark_price: Decimal) -> bool {
        match self.liquidation_price {
            Some(liq) => match self.side {
                PositionSide::Long => mark_price <= liq,
                PositionSide::Short => mark_price >= liq,
            },
            None => false,
        }
    }
}

/// Fill-quantity-weighted average entry: (q1*p1 + q2*p2) / (q1 + q2).
pub fn weighted_entry(q1: Decimal, p1: Decimal, q2: Decimal, p2: Decimal) -> Decimal {
    (q1 * p1 + q2 * p2) / (q1 + q2)
}

/// Read-only position projection with derived unrealized PnL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionView {
    pub id: PositionId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub leverage: Leverage,
    pub margin: Decimal,
    pub liquidation_price: Option<Decimal>,
    /// None when no mark price is available for the symbol.
    pub unrealized_pnl: Option<Decimal>,
}

impl PositionView {
    pub fn from_position(position: &Position, mark: Option<Decimal>) -> Self {
        Self {
            id: position.id,
            symbol: position.symbol.clone(),
            side: position.side,
            quantity: position.quantity,
            entry_price: position.entry_price,
            leverage: position.leverage,
            margin: position.margin,
            liquidation_price: position.liquidation_price,
            unrealized_pnl: mark.map(|m| position.unrealized_pnl(m)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long_position() -> Position {
        Position::open(
            PositionId(1),
            AccountId(1),
            Symbol::new("BTCUSDT"),
            PositionSide::Long,
            dec!(1),
            dec!(50000),
            Leverage::new(10).unwrap(),
            dec!(5000),
            Some(dec!(45200)),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn weighted_entry_average() {
        // 1 @ 50000 then 1 @ 52000 → 51000
        assert_eq!(weighted_entry(dec!(1), dec!(50000), dec!(1), dec!(52000)), dec!(51000));
        // 3 @ 100 then 1 @ 200 → 125
        assert_eq!(weighted_entry(dec!(3), dec!(100), dec!(1), dec!(200)), dec!(125));
    }

    #[test]
    fn extend_averages_entry_and_keeps_liquidation_price() {
        let mut pos = long_position();
        pos.extend(dec!(1), dec!(52000), dec!(5200), Timestamp::from_millis(1));

        assert_eq!(pos.quantity, dec!(2));
        assert_eq!(pos.entry_price, dec!(51000));
        assert_eq!(pos.margin, dec!(10200));
        assert_eq!(pos.liquidation_price, Some(dec!(45200)));
    }

    #[test]
    fn partial_reduce_releases_proportional_margin() {
        let mut pos = long_position();
        let released = pos.reduce(dec!(0.4), Timestamp::from_millis(1));

        assert_eq!(released, dec!(2000));
        assert_eq!(pos.quantity, dec!(0.6));
        assert_eq!(pos.margin, dec!(3000));
        assert_eq!(pos.status, PositionStatus::Open);
    }

    #[test]
    fn full_reduce_closes_the_row() {
        let mut pos = long_position();
        let released = pos.reduce(dec!(1), Timestamp::from_millis(1));

        assert_eq!(released, dec!(5000));
        assert_eq!(pos.quantity, dec!(0));
        assert_eq!(pos.status, PositionStatus::Closed);
        assert!(pos.closed_at.is_some());
    }

    #[test]
    fn unrealized_pnl_by_side() {
        let long = long_position();
        assert_eq!(long.unrealized_pnl(dec!(52000)), dec!(2000));
        assert_eq!(long.unrealized_pnl(dec!(48000)), dec!(-2000));

        let mut short = long_position();
        short.side = PositionSide::Short;
        assert_eq!(short.unrealized_pnl(dec!(48000)), dec!(2000));
    }

    #[test]
    fn breach_boundaries() {
        let long = long_position();
        assert!(long.is_breached(dec!(45200)));
        assert!(!long.is_breached(dec!(45201)));

        let mut short = long_position();
        short.side = PositionSide::Short;
        short.liquidation_price = Some(dec!(54800));
        assert!(short.is_breached(dec!(54800)));
        assert!(!short.is_breached(dec!(54799)));
    }
}
