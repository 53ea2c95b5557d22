// 7.0: the transactional ledger. five relations plus the book snapshot,
// accessed only through transaction-scoped handles.
//
// `Ledger::begin` hands out a `LedgerTx` that owns the store for its
// lifetime: transactions serialize, and every one is all-or-nothing via a
// snapshot taken at begin. Dropping a handle without `commit` rolls back.
// Order claiming skips rows already held, so no two settlement paths ever
// fill the same order. Mutual exclusion lives here, not in the engine.

use crate::account::Account;
use crate::book::SymbolBook;
use crate::bracket::{self, LeverageBracket};
use crate::order::Order;
use crate::position::Position;
use crate::trade::Trade;
use crate::types::{
    AccountId, BookSide, OrderId, OrderSide, OrderStatus, OrderType, PositionId, PositionSide,
    PositionStatus, Symbol, Timestamp, TradeId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    orders: BTreeMap<OrderId, Order>,
    positions: BTreeMap<PositionId, Position>,
    trades: Vec<Trade>,
    brackets: Vec<LeverageBracket>,
    books: HashMap<Symbol, SymbolBook>,
    next_account_id: u64,
    next_order_id: u64,
    next_position_id: u64,
    next_trade_id: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("account {0:?} not found")]
    MissingAccount(AccountId),

    #[error("order {0:?} not found")]
    MissingOrder(OrderId),

    #[error("position {0:?} not found")]
    MissingPosition(PositionId),
}

/// Shared handle to the ledger. Cheap to clone; each flow holds its own.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    inner: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction. Blocks until any in-flight transaction commits
    /// or rolls back.
    pub async fn begin(&self) -> LedgerTx {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let snapshot = guard.clone();
        LedgerTx {
            guard,
            snapshot: Some(snapshot),
            claimed: HashSet::new(),
        }
    }
}

/// Transaction-scoped handle. All reads and writes go through one of these.
pub struct LedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    snapshot: Option<LedgerState>,
    /// Orders claimed for settlement within this transaction.
    claimed: HashSet<OrderId>,
}

impl LedgerTx {
    pub fn commit(mut self) {
        self.snapshot = None;
    }

    pub fn rollback(self) {
        // drop restores the snapshot
    }

    // -- accounts -----------------------------------------------------------

    pub fn create_account(&mut self, owner: &str, starting_balance: Decimal, now: Timestamp) -> AccountId {
        self.guard.next_account_id += 1;
        let id = AccountId(self.guard.next_account_id);
        let account = Account::new(id, owner, starting_balance, now);
        self.guard.accounts.insert(id, account);
        id
    }

    pub fn account(&self, id: AccountId) -> Result<&Account, StoreError> {
        self.guard.accounts.get(&id).ok_or(StoreError::MissingAccount(id))
    }

    pub fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, StoreError> {
        self.guard.accounts.get_mut(&id).ok_or(StoreError::MissingAccount(id))
    }

    pub fn account_by_owner(&self, owner: &str) -> Option<&Account> {
        self.guard.accounts.values().find(|a| a.owner == owner)
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.guard.accounts.values().cloned().collect()
    }

    // -- orders -------------------------------------------------------------

    pub fn next_order_id(&mut self) -> OrderId {
        self.guard.next_order_id += 1;
        OrderId(self.guard.next_order_id)
    }

    pub fn insert_order(&mut self, order: Order) {
        self.guard.orders.insert(order.id, order);
    }

    pub fn order(&self, id: OrderId) -> Result<&Order, StoreError> {
        self.guard.orders.get(&id).ok_or(StoreError::MissingOrder(id))
    }

    pub fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, StoreError> {
        self.guard.orders.get_mut(&id).ok_or(StoreError::MissingOrder(id))
    }

    pub fn orders_for_account(
        &self,
        account_id: AccountId,
        symbol: Option<&Symbol>,
        status: Option<OrderStatus>,
    ) -> Vec<Order> {
        self.guard
            .orders
            .values()
            .filter(|o| o.account_id == account_id)
            .filter(|o| symbol.map_or(true, |s| o.symbol == *s))
            .filter(|o| status.map_or(true, |st| o.status == st))
            .cloned()
            .collect()
    }

    /// Claim the next PENDING limit order on `symbol` crossed by a print at
    /// `trade_price`. Rows already claimed in this transaction or listed in
    /// `skip` are passed over (claim-and-skip-if-held); exclusion across
    /// transactions comes from order status flips committed by the winner.
    pub fn claim_next_crossed(
        &mut self,
        symbol: &Symbol,
        trade_price: Decimal,
        skip: &HashSet<OrderId>,
    ) -> Option<Order> {
        let claimed = &self.claimed;
        let next = self
            .guard
            .orders
            .values()
            .find(|o| {
                o.symbol == *symbol
                    && o.order_type == OrderType::Limit
                    && o.status == OrderStatus::Pending
                    && !claimed.contains(&o.id)
                    && !skip.contains(&o.id)
                    && o.is_crossed_by(trade_price)
            })
            .cloned();

        if let Some(order) = &next {
            self.claimed.insert(order.id);
        }
        next
    }

    // -- positions ----------------------------------------------------------

    pub fn next_position_id(&mut self) -> PositionId {
        self.guard.next_position_id += 1;
        PositionId(self.guard.next_position_id)
    }

    pub fn insert_position(&mut self, position: Position) {
        debug_assert!(
            self.open_position(position.account_id, &position.symbol, position.side)
                .is_none(),
            "at most one OPEN position per (account, symbol, side)"
        );
        self.guard.positions.insert(position.id, position);
    }

    pub fn position(&self, id: PositionId) -> Result<&Position, StoreError> {
        self.guard.positions.get(&id).ok_or(StoreError::MissingPosition(id))
    }

    pub fn position_mut(&mut self, id: PositionId) -> Result<&mut Position, StoreError> {
        self.guard.positions.get_mut(&id).ok_or(StoreError::MissingPosition(id))
    }

    /// The account's single OPEN position on (symbol, side), if any.
    pub fn open_position(
        &self,
        account_id: AccountId,
        symbol: &Symbol,
        side: PositionSide,
    ) -> Option<&Position> {
        self.guard.positions.values().find(|p| {
            p.account_id == account_id
                && p.symbol == *symbol
                && p.side == side
                && p.status == PositionStatus::Open
        })
    }

    pub fn open_positions(&self) -> Vec<Position> {
        self.guard
            .positions
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .cloned()
            .collect()
    }

    pub fn open_positions_for(&self, account_id: AccountId) -> Vec<Position> {
        self.guard
            .positions
            .values()
            .filter(|p| p.account_id == account_id && p.status == PositionStatus::Open)
            .cloned()
            .collect()
    }

    // -- trades -------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn record_trade(
        &mut self,
        order_id: Option<OrderId>,
        account_id: AccountId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        realized_pnl: Decimal,
        now: Timestamp,
    ) -> TradeId {
        self.guard.next_trade_id += 1;
        let id = TradeId(self.guard.next_trade_id);
        self.guard.trades.push(Trade {
            id,
            order_id,
            account_id,
            symbol,
            side,
            quantity,
            price,
            realized_pnl,
            executed_at: now,
        });
        id
    }

    pub fn trades(&self) -> &[Trade] {
        &self.guard.trades
    }

    // -- leverage brackets --------------------------------------------------

    pub fn seed_brackets(&mut self, brackets: Vec<LeverageBracket>) {
        self.guard.brackets = brackets;
    }

    pub fn brackets_for(&self, symbol: &Symbol) -> Vec<LeverageBracket> {
        let mut rows: Vec<LeverageBracket> = self
            .guard
            .brackets
            .iter()
            .filter(|b| b.symbol == *symbol)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.bracket_id);
        rows
    }

    pub fn maint_margin_rate(&self, symbol: &Symbol, notional: Decimal, default_rate: Decimal) -> Decimal {
        bracket::maint_margin_rate(&self.guard.brackets, symbol, notional, default_rate)
    }

    // -- book snapshot ------------------------------------------------------

    pub fn apply_depth(&mut self, symbol: &Symbol, side: BookSide, price: Decimal, quantity: Decimal) {
        let book = self.guard.books.entry(symbol.clone()).or_default();
        book.apply(side, price, quantity);
        if book.is_empty() {
            self.guard.books.remove(symbol);
        }
    }

    pub fn book(&self, symbol: &Symbol) -> Option<&SymbolBook> {
        self.guard.books.get(symbol)
    }

    /// Current bid/ask midpoints for every symbol with a two-sided book.
    pub fn mark_prices(&self) -> HashMap<Symbol, Decimal> {
        self.guard
            .books
            .iter()
            .filter_map(|(symbol, book)| book.mid_price().map(|mid| (symbol.clone(), mid)))
            .collect()
    }
}

impl Drop for LedgerTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}
