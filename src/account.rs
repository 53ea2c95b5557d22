//! Account rows and balance mutations.
//!
//! Every account splits its funds three ways: `available_balance` is free
//! margin, `margin_balance` is locked behind open positions and resting
//! reservations, and `total_balance` is their sum. Each mutation below
//! preserves `total_balance == available_balance + margin_balance`.

use crate::position::Position;
use crate::types::{AccountId, PositionStatus, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub margin_balance: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    pub fn new(id: AccountId, owner: &str, starting_balance: Decimal, now: Timestamp) -> Self {
        Self {
            id,
            owner: owner.to_owned(),
            total_balance: starting_balance,
            available_balance: starting_balance,
            margin_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move `amount` available → margin.
    pub fn reserve_margin(&mut self, amount: Decimal, now: Timestamp) -> Result<(), AccountError> {
        if amount > self.available_balance {
            return Err(AccountError::InsufficientBalance {
                requested: amount,
                available: self.available_balance,
            });
        }
        self.available_balance -= amount;
        self.margin_balance += amount;
        self.updated_at = now;
        Ok(())
    }

    /// Move `amount` margin → available. Callers only release what they reserved.
    pub fn release_margin(&mut self, amount: Decimal, now: Timestamp) {
        debug_assert!(amount <= self.margin_balance);
        self.margin_balance -= amount;
        self.available_balance += amount;
        self.updated_at = now;
    }

    /// Settle a netting close: `released` margin returns to available and the
    /// realized `pnl` lands in both available and total.
    pub fn apply_close(&mut self, released: Decimal, pnl: Decimal, now: Timestamp) {
        self.margin_balance -= released;
        self.available_balance += released + pnl;
        self.total_balance += pnl;
        self.updated_at = now;
    }

    /// Forced close: the full pledged margin is lost.
    pub fn absorb_liquidation(&mut self, margin: Decimal, now: Timestamp) {
        self.margin_balance -= margin;
        self.total_balance -= margin;
        self.updated_at = now;
    }

    pub fn balanced(&self) -> bool {
        self.total_balance == self.available_balance + self.margin_balance
    }
}

/// Read-only account projection with derived unrealized PnL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub owner: String,
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub margin_balance: Decimal,
    pub unrealized_pnl: Decimal,
}

pub fn account_view(
    account: &Account,
    positions: &[Position],
    marks: &HashMap<Symbol, Decimal>,
) -> AccountView {
    let unrealized_pnl = positions
        .iter()
        .filter(|p| p.account_id == account.id && p.status == PositionStatus::Open)
        .filter_map(|p| marks.get(&p.symbol).map(|mark| p.unrealized_pnl(*mark)))
        .sum();

    AccountView {
        id: account.id,
        owner: account.owner.clone(),
        total_balance: account.total_balance,
        available_balance: account.available_balance,
        margin_balance: account.margin_balance,
        unrealized_pnl,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_account() -> Account {
        Account::new(AccountId(1), "trader", dec!(100000), Timestamp::from_millis(0))
    }

    #[test]
    fn reserve_and_release_preserve_identity() {
        let mut account = test_account();
        let now = Timestamp::from_millis(1);

        account.reserve_margin(dec!(5000), now).unwrap();
        assert_eq!(account.available_balance, dec!(95000));
        assert_eq!(account.margin_balance, dec!(5000));
        assert_eq!(account.total_balance, dec!(100000));
        assert!(account.balanced());

        account.release_margin(dec!(5000), now);
        assert_eq!(account.available_balance, dec!(100000));
        assert_eq!(account.margin_balance, dec!(0));
        assert!(account.balanced());
    }

    #[test]
    fn reserve_over_available_fails() {
        let mut account = test_account();
        let result = account.reserve_margin(dec!(200000), Timestamp::from_millis(1));
        assert!(matches!(
            result,
            Err(AccountError::InsufficientBalance { .. })
        ));
        assert!(account.balanced());
    }

    #[test]
    fn close_with_profit() {
        let mut account = test_account();
        let now = Timestamp::from_millis(1);
        account.reserve_margin(dec!(10000), now).unwrap();

        account.apply_close(dec!(10000), dec!(2500), now);
        assert_eq!(account.total_balance, dec!(102500));
        assert_eq!(account.available_balance, dec!(102500));
        assert_eq!(account.margin_balance, dec!(0));
        assert!(account.balanced());
    }

    #[test]
    fn close_with_clamped_loss_never_goes_negative() {
        let mut account = Account::new(AccountId(1), "trader", dec!(100), Timestamp::from_millis(0));
        let now = Timestamp::from_millis(1);
        account.reserve_margin(dec!(100), now).unwrap();

        // Loss clamped to the pledged margin: released + pnl nets to zero.
        account.apply_close(dec!(100), dec!(-100), now);
        assert_eq!(account.total_balance, dec!(0));
        assert_eq!(account.available_balance, dec!(0));
        assert_eq!(account.margin_balance, dec!(0));
        assert!(account.balanced());
    }

    #[test]
    fn liquidation_takes_full_margin() {
        let mut account = test_account();
        let now = Timestamp::from_millis(1);
        account.reserve_margin(dec!(4000), now).unwrap();

        account.absorb_liquidation(dec!(4000), now);
        assert_eq!(account.total_balance, dec!(96000));
        assert_eq!(account.available_balance, dec!(96000));
        assert_eq!(account.margin_balance, dec!(0));
        assert!(account.balanced());
    }
}
