//! Ledger entry types.
//!
//! Each wallet has an append-only list of signed entries. The `balance` stored
//! on an entry is the wallet balance right after that entry was applied, so
//! the latest entry's balance always equals the wallet's balance.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use walletcore_common::{now, Timestamp, TransactionId, TransferId, WalletId};

use crate::wallet::Wallet;

/// What produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Funds entering the system.
    Deposit,
    /// One leg of a wallet-to-wallet transfer.
    Transfer,
}

impl TransactionType {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!("unknown transaction type {other:?}")),
        }
    }
}

/// A single immutable entry in a wallet's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique entry ID.
    pub id: TransactionId,
    /// Wallet the entry belongs to.
    pub wallet_id: WalletId,
    /// Signed amount: positive credits, negative debits.
    pub amount: Decimal,
    /// Wallet balance after this entry.
    pub balance: Decimal,
    /// Entry type.
    #[serde(rename = "transaction_type")]
    pub kind: TransactionType,
    /// Transfer this entry is a leg of, if any.
    pub reference_id: Option<TransferId>,
    /// When the entry was written.
    pub created_at: Timestamp,
}

impl Transaction {
    /// Build an entry that applies `amount` on top of `previous_balance`.
    pub fn apply(
        wallet_id: WalletId,
        previous_balance: Decimal,
        amount: Decimal,
        kind: TransactionType,
        reference_id: Option<TransferId>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            wallet_id,
            amount,
            balance: previous_balance + amount,
            kind,
            reference_id,
            created_at: now(),
        }
    }

    /// Opening deposit for a freshly provisioned wallet.
    pub fn deposit(wallet_id: WalletId, previous_balance: Decimal, amount: Decimal) -> Self {
        Self::apply(
            wallet_id,
            previous_balance,
            amount,
            TransactionType::Deposit,
            None,
        )
    }

    /// Check if this entry decreases the balance.
    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Sort key used by ledger listings.
    pub fn sort_key(&self) -> (Timestamp, TransactionId) {
        (self.created_at, self.id)
    }
}

/// The two entries one transfer writes, computed from the balances read
/// inside the unit of work.
#[derive(Debug, Clone)]
pub struct TransferLegs {
    /// Negative entry on the origin wallet.
    pub debit: Transaction,
    /// Positive entry on the destination wallet.
    pub credit: Transaction,
}

impl TransferLegs {
    /// Compute both legs of moving `amount` from `origin` to `destination`.
    pub fn new(transfer_id: TransferId, origin: &Wallet, destination: &Wallet, amount: Decimal) -> Self {
        let debit = Transaction::apply(
            origin.id,
            origin.balance,
            -amount,
            TransactionType::Transfer,
            Some(transfer_id),
        );
        let credit = Transaction::apply(
            destination.id,
            destination.balance,
            amount,
            TransactionType::Transfer,
            Some(transfer_id),
        );

        Self { debit, credit }
    }

    /// Verify the legs cancel out.
    pub fn is_balanced(&self) -> bool {
        (self.debit.amount + self.credit.amount).is_zero()
    }

    /// Iterate debit first, then credit.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        [&self.debit, &self.credit].into_iter()
    }
}
