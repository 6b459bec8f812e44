//! Wallet definitions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use walletcore_common::{UserId, WalletId};

/// A wallet holding a single-currency balance owned by one user.
///
/// Balances only change through the transfer engine's unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet identifier.
    pub id: WalletId,
    /// Owning user.
    pub user_id: UserId,
    /// Current balance, never negative.
    pub balance: Decimal,
}

impl Wallet {
    /// Create a wallet for `user_id` with an opening balance.
    pub fn new(user_id: UserId, balance: Decimal) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            balance,
        }
    }

    /// Check if the wallet belongs to the user.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Check if wallet has sufficient funds for a debit.
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sufficient_funds_is_inclusive() {
        let wallet = Wallet::new(UserId::new(), dec!(20.00));

        assert!(wallet.has_sufficient_funds(dec!(12.75)));
        assert!(wallet.has_sufficient_funds(dec!(20.00)));
        assert!(!wallet.has_sufficient_funds(dec!(20.01)));
    }

    #[test]
    fn test_ownership() {
        let owner = UserId::new();
        let wallet = Wallet::new(owner, Decimal::ZERO);

        assert!(wallet.is_owned_by(owner));
        assert!(!wallet.is_owned_by(UserId::new()));
    }
}
