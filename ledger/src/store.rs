//! Storage ports consumed by the transfer engine and the wallet service.
//!
//! Backends implement [`LedgerStore`] for reads and hand out [`UnitOfWork`]s
//! for writes. Nothing written through a unit is visible to other readers
//! until [`UnitOfWork::commit`] returns; dropping a unit without committing
//! discards its writes.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use walletcore_common::WalletId;

use crate::error::StorageResult;
use crate::journal::Transaction;
use crate::pagination::{ListOptions, TransactionList};
use crate::transfer::Transfer;
use crate::wallet::Wallet;

/// Read access to committed state, plus the entry point for writes.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Get a wallet by ID.
    async fn get_wallet(&self, id: WalletId) -> StorageResult<Option<Wallet>>;

    /// Get the subset of `ids` that exist.
    async fn find_wallets(&self, ids: &[WalletId]) -> StorageResult<HashMap<WalletId, Wallet>>;

    /// List one page of a wallet's ledger.
    ///
    /// Implementations fetch `options.fetch_limit()` rows ordered by
    /// `(created_at, id)` in `options.order`, starting at `options.from_id`
    /// inclusive, and build the page with [`TransactionList::from_rows`].
    async fn list_transactions(
        &self,
        wallet_id: WalletId,
        options: &ListOptions,
    ) -> StorageResult<TransactionList>;

    /// Open an atomic unit of work.
    async fn begin(&self) -> StorageResult<Box<dyn UnitOfWork>>;
}

/// A group of writes that become visible together or not at all.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Lock and read the wallets in `ids` that exist.
    ///
    /// Rows are locked in ascending id order whatever the order of `ids`, and
    /// stay locked until the unit commits or rolls back.
    async fn lock_wallets(&mut self, ids: &[WalletId]) -> StorageResult<HashMap<WalletId, Wallet>>;

    /// Record a transfer. Returns it with the server-assigned timestamp.
    async fn insert_transfer(&mut self, transfer: &Transfer) -> StorageResult<Transfer>;

    /// Append a ledger entry. Returns it with the server-assigned timestamp.
    async fn insert_transaction(&mut self, entry: &Transaction) -> StorageResult<Transaction>;

    /// Set a wallet's balance.
    async fn update_balance(&mut self, id: WalletId, balance: Decimal) -> StorageResult<()>;

    /// Make every write of this unit durable and visible.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discard every write of this unit.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
