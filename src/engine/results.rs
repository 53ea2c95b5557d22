// 8.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::store::StoreError;
use crate::types::{Leverage, OrderId, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the transport layer gets back from placing an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub avg_price: Option<Decimal>,
}

/// Outcome of sweeping the book for a market order. A zero-fill result is
/// not an error; the order simply stays PENDING.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResult {
    pub avg_price: Decimal,
    pub filled_qty: Decimal,
    pub total_cost: Decimal,
}

impl SweepResult {
    pub fn zero() -> Self {
        Self {
            avg_price: Decimal::ZERO,
            filled_qty: Decimal::ZERO,
            total_cost: Decimal::ZERO,
        }
    }

    pub fn is_zero_fill(&self) -> bool {
        self.filled_qty.is_zero()
    }
}

/// Tally of one limit-matching pass over a trade print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub settled: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("price is required and must be positive for LIMIT orders")]
    MissingLimitPrice,

    #[error("leverage {requested} outside [{min}, {max}]", min = Leverage::MIN, max = Leverage::MAX)]
    InvalidLeverage { requested: u32 },

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("account does not own the referenced order or account")]
    AccountMismatch,

    #[error("order {0:?} not found")]
    OrderNotFound(OrderId),

    #[error("order {id:?} not cancellable in state {status:?}")]
    NotCancellable { id: OrderId, status: OrderStatus },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<AccountError> for EngineError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientBalance {
                requested,
                available,
            } => EngineError::InsufficientBalance {
                required: requested,
                available,
            },
        }
    }
}
