// 2.0: order rows and their status transitions.
// LIMIT orders carry the margin reserved at intake; MARKET orders reserve at fill.

use crate::types::{
    AccountId, Leverage, OrderId, OrderSide, OrderStatus, OrderType, Symbol, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Limit price. None for MARKET orders.
    pub price: Option<Decimal>,
    pub leverage: Leverage,
    pub status: OrderStatus,
    pub executed_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    /// Margin moved available → margin at intake. Zero once settled or refunded.
    pub reserved_margin: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub filled_at: Option<Timestamp>,
}

impl Order {
    pub fn new_market(
        id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        leverage: Leverage,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            account_id,
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            leverage,
            status: OrderStatus::Pending,
            executed_quantity: Decimal::ZERO,
            avg_fill_price: None,
            reserved_margin: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            filled_at: None,
        }
    }

    pub fn new_limit(
        id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        leverage: Leverage,
        reserved_margin: Decimal,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            account_id,
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            leverage,
            status: OrderStatus::Pending,
            executed_quantity: Decimal::ZERO,
            avg_fill_price: None,
            reserved_margin,
            created_at: now,
            updated_at: now,
            filled_at: None,
        }
    }

    /// Whether a trade print at `trade_price` crosses this resting limit order.
    /// BUY fills when its limit is at or above the print, SELL at or below.
    pub fn is_crossed_by(&self, trade_price: Decimal) -> bool {
        match (self.order_type, self.price) {
            (OrderType::Limit, Some(limit)) => match self.side {
                OrderSide::Buy => limit >= trade_price,
                OrderSide::Sell => limit <= trade_price,
            },
            _ => false,
        }
    }

    /// Record an execution. A sweep that ran short leaves the order
    /// PARTIALLY_FILLED; anything else is FILLED.
    pub fn record_fill(&mut self, quantity: Decimal, avg_price: Decimal, now: Timestamp) {
        self.executed_quantity = quantity;
        self.avg_fill_price = Some(avg_price);
        self.status = if quantity < self.quantity {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Filled
        };
        self.filled_at = Some(now);
        self.updated_at = now;
    }

    pub fn cancel(&mut self, now: Timestamp) {
        self.status = OrderStatus::Cancelled;
        self.reserved_margin = Decimal::ZERO;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limit(side: OrderSide, price: Decimal) -> Order {
        Order::new_limit(
            OrderId(1),
            AccountId(1),
            Symbol::new("BTCUSDT"),
            side,
            dec!(1),
            price,
            Leverage::new(10).unwrap(),
            dec!(5000),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn buy_crosses_at_or_below_limit() {
        let order = limit(OrderSide::Buy, dec!(50000));
        assert!(order.is_crossed_by(dec!(49900)));
        assert!(order.is_crossed_by(dec!(50000)));
        assert!(!order.is_crossed_by(dec!(50100)));
    }

    #[test]
    fn sell_crosses_at_or_above_limit() {
        let order = limit(OrderSide::Sell, dec!(50000));
        assert!(order.is_crossed_by(dec!(50100)));
        assert!(order.is_crossed_by(dec!(50000)));
        assert!(!order.is_crossed_by(dec!(49900)));
    }

    #[test]
    fn market_orders_never_cross() {
        let order = Order::new_market(
            OrderId(1),
            AccountId(1),
            Symbol::new("BTCUSDT"),
            OrderSide::Buy,
            dec!(1),
            Leverage::new(10).unwrap(),
            Timestamp::from_millis(0),
        );
        assert!(!order.is_crossed_by(dec!(1)));
    }

    #[test]
    fn short_fill_is_partial() {
        let mut order = limit(OrderSide::Buy, dec!(50000));
        order.record_fill(dec!(0.4), dec!(50000), Timestamp::from_millis(1));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);

        let mut order = limit(OrderSide::Buy, dec!(50000));
        order.record_fill(dec!(1), dec!(50000), Timestamp::from_millis(1));
        assert_eq!(order.status, OrderStatus::Filled);
    }
}
