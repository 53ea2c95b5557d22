// 5.0: append-only execution records. one settled order yields up to two
// rows: a netting close carrying realized pnl and a fresh open with pnl 0.
// liquidations append one row with no order reference.

use crate::types::{AccountId, OrderId, OrderSide, Symbol, Timestamp, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    /// None for liquidation trades, which have no originating order.
    pub order_id: Option<OrderId>,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub realized_pnl: Decimal,
    pub executed_at: Timestamp,
}
