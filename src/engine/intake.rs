//! Order intake: validation, account resolution, margin reservation and the
//! market handoff. Also cancellation and the read-only projections exposed
//! to the transport layer.

use super::results::{EngineError, OrderAck};
use super::Engine;
use crate::account::{account_view, AccountView};
use crate::bracket::LeverageBracket;
use crate::margin::required_margin;
use crate::order::Order;
use crate::position::PositionView;
use crate::store::LedgerTx;
use crate::types::{
    AccountId, Leverage, OrderId, OrderSide, OrderStatus, OrderType, Symbol, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// An order as the transport layer hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub leverage: u32,
    /// External identity the account belongs to.
    pub owner: String,
    /// Explicit account; resolved (or auto-created) from `owner` when absent.
    pub account: Option<AccountId>,
}

impl Engine {
    /// Validate and execute an order request.
    ///
    /// LIMIT orders reserve `price * quantity / leverage` from available and
    /// rest PENDING. MARKET orders sweep the book and settle before this
    /// returns; an empty book leaves them PENDING with a zero-fill ack.
    pub async fn place_order(&self, request: OrderRequest) -> Result<OrderAck, EngineError> {
        if request.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity);
        }
        let leverage = Leverage::new(request.leverage).ok_or(EngineError::InvalidLeverage {
            requested: request.leverage,
        })?;

        match request.order_type {
            OrderType::Limit => {
                let Some(price) = request.price.filter(|p| *p > Decimal::ZERO) else {
                    return Err(EngineError::MissingLimitPrice);
                };
                self.place_limit(request, leverage, price).await
            }
            OrderType::Market => self.place_market(request, leverage).await,
        }
    }

    /// Reserve margin and write the resting order, one transaction.
    async fn place_limit(
        &self,
        request: OrderRequest,
        leverage: Leverage,
        price: Decimal,
    ) -> Result<OrderAck, EngineError> {
        let now = Timestamp::now();
        let account_id = self.resolve_account_committed(&request, now).await?;

        let mut tx = self.ledger.begin().await;
        let required = required_margin(price, request.quantity, leverage);
        tx.account_mut(account_id)?.reserve_margin(required, now)?;

        let order_id = tx.next_order_id();
        tx.insert_order(Order::new_limit(
            order_id,
            account_id,
            request.symbol.clone(),
            request.side,
            request.quantity,
            price,
            leverage,
            required,
            now,
        ));
        tx.commit();

        info!(order_id = order_id.0, symbol = %request.symbol, reserved = %required, "limit order resting");
        Ok(OrderAck {
            order_id,
            status: OrderStatus::Pending,
            avg_price: None,
        })
    }

    /// Write the order, sweep the book and settle, one transaction. A zero
    /// fill commits the PENDING row; a failed settlement rolls everything
    /// back and records the rejection separately.
    async fn place_market(
        &self,
        request: OrderRequest,
        leverage: Leverage,
    ) -> Result<OrderAck, EngineError> {
        let now = Timestamp::now();
        let account_id = self.resolve_account_committed(&request, now).await?;

        let mut tx = self.ledger.begin().await;
        let order_id = tx.next_order_id();
        tx.insert_order(Order::new_market(
            order_id,
            account_id,
            request.symbol.clone(),
            request.side,
            request.quantity,
            leverage,
            now,
        ));

        let sweep = self.sweep_book(&tx, &request.symbol, request.side, request.quantity);
        if sweep.is_zero_fill() {
            warn!(symbol = %request.symbol, "no liquidity, market order left pending");
            tx.commit();
            return Ok(OrderAck {
                order_id,
                status: OrderStatus::Pending,
                avg_price: None,
            });
        }

        match self.settle_fill(&mut tx, order_id, sweep.filled_qty, sweep.avg_price) {
            Ok(()) => {
                let status = tx.order(order_id)?.status;
                tx.commit();
                Ok(OrderAck {
                    order_id,
                    status,
                    avg_price: Some(sweep.avg_price),
                })
            }
            Err(err) => {
                tx.rollback();
                warn!(symbol = %request.symbol, error = %err, "market settlement failed");
                if let EngineError::InsufficientBalance { .. } = err {
                    self.record_rejected(&request, account_id, leverage).await?;
                }
                Err(err)
            }
        }
    }

    /// Cancel a PENDING or PARTIALLY_FILLED order, refunding any margin
    /// still reserved for it.
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        account_id: AccountId,
    ) -> Result<(), EngineError> {
        let now = Timestamp::now();
        let mut tx = self.ledger.begin().await;

        let order = tx
            .order(order_id)
            .map_err(|_| EngineError::OrderNotFound(order_id))?
            .clone();
        if order.account_id != account_id {
            return Err(EngineError::AccountMismatch);
        }
        if !order.status.is_cancellable() {
            return Err(EngineError::NotCancellable {
                id: order_id,
                status: order.status,
            });
        }

        if order.reserved_margin > Decimal::ZERO {
            tx.account_mut(order.account_id)?
                .release_margin(order.reserved_margin, now);
        }
        tx.order_mut(order_id)?.cancel(now);
        tx.commit();

        info!(order_id = order_id.0, "order cancelled");
        Ok(())
    }

    /// Orders for an account, optionally filtered by symbol and status.
    pub async fn list_orders(
        &self,
        account_id: AccountId,
        symbol: Option<Symbol>,
        status: Option<OrderStatus>,
    ) -> Vec<Order> {
        let tx = self.ledger.begin().await;
        tx.orders_for_account(account_id, symbol.as_ref(), status)
    }

    /// Open positions for an account with unrealized PnL against the
    /// current midpoints.
    pub async fn list_positions(&self, account_id: AccountId) -> Vec<PositionView> {
        let tx = self.ledger.begin().await;
        let marks = tx.mark_prices();
        tx.open_positions_for(account_id)
            .iter()
            .map(|p| PositionView::from_position(p, marks.get(&p.symbol).copied()))
            .collect()
    }

    pub async fn account_overview(&self, account_id: AccountId) -> Result<AccountView, EngineError> {
        let tx = self.ledger.begin().await;
        let account = tx.account(account_id)?;
        let positions = tx.open_positions_for(account_id);
        let marks = tx.mark_prices();
        Ok(account_view(account, &positions, &marks))
    }

    pub async fn leverage_brackets(&self, symbol: &Symbol) -> Vec<LeverageBracket> {
        let tx = self.ledger.begin().await;
        tx.brackets_for(symbol)
    }

    /// Resolve the request's account and commit on its own: an auto-created
    /// account survives a later rejection or rollback, as the venue's would.
    async fn resolve_account_committed(
        &self,
        request: &OrderRequest,
        now: Timestamp,
    ) -> Result<AccountId, EngineError> {
        let mut tx = self.ledger.begin().await;
        let id = self.resolve_account(&mut tx, request, now)?;
        tx.commit();
        Ok(id)
    }

    /// Map a request to its account. Explicit ids must exist and belong to
    /// the request's owner; otherwise the owner's account is found or
    /// auto-created with the configured starting balance.
    fn resolve_account(
        &self,
        tx: &mut LedgerTx,
        request: &OrderRequest,
        now: Timestamp,
    ) -> Result<AccountId, EngineError> {
        match request.account {
            Some(id) => {
                let account = tx.account(id).map_err(|_| EngineError::AccountMismatch)?;
                if account.owner != request.owner {
                    return Err(EngineError::AccountMismatch);
                }
                Ok(id)
            }
            None => match tx.account_by_owner(&request.owner) {
                Some(account) => Ok(account.id),
                None => {
                    let id = tx.create_account(&request.owner, self.config.starting_balance, now);
                    info!(owner = %request.owner, "auto-created account");
                    Ok(id)
                }
            },
        }
    }

    /// Persist a REJECTED order row after a rolled-back market settlement.
    async fn record_rejected(
        &self,
        request: &OrderRequest,
        account_id: AccountId,
        leverage: Leverage,
    ) -> Result<(), EngineError> {
        let now = Timestamp::now();
        let mut tx = self.ledger.begin().await;
        let order_id = tx.next_order_id();
        let mut order = Order::new_market(
            order_id,
            account_id,
            request.symbol.clone(),
            request.side,
            request.quantity,
            leverage,
            now,
        );
        order.status = OrderStatus::Rejected;
        tx.insert_order(order);
        tx.commit();
        Ok(())
    }
}
