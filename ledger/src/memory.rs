//! In-memory ledger backend.
//!
//! Committed state sits behind one `RwLock`; a commit publishes all of its
//! unit's writes under a single write guard, so readers observe either none
//! or all of a transfer. Row locking uses one async mutex per wallet, taken
//! as owned guards in ascending id order and held for the unit's lifetime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use walletcore_common::{now, TransferId, UserId, WalletId};

use crate::error::{StorageError, StorageResult};
use crate::journal::Transaction;
use crate::pagination::{ListOptions, TransactionList};
use crate::store::{LedgerStore, UnitOfWork};
use crate::transfer::Transfer;
use crate::wallet::Wallet;

/// Point in a unit of work where a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Begin,
    LockWallets,
    InsertTransfer,
    InsertTransaction,
    UpdateBalance,
    Commit,
    Rollback,
}

/// Injected misbehavior, applied every time the stage runs until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The stage returns a storage error.
    Fail,
    /// The stage stalls before doing its work.
    Delay(Duration),
}

#[derive(Debug, Default)]
struct MemoryState {
    wallets: HashMap<WalletId, Wallet>,
    /// Entries per wallet, in commit order.
    ledgers: HashMap<WalletId, Vec<Transaction>>,
    transfers: Vec<Transfer>,
}

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<MemoryState>,
    row_locks: DashMap<WalletId, Arc<Mutex<()>>>,
    faults: DashMap<Stage, Fault>,
}

impl Inner {
    async fn checkpoint(&self, stage: Stage) -> StorageResult<()> {
        let fault = self.faults.get(&stage).map(|f| *f);
        match fault {
            None => Ok(()),
            Some(Fault::Fail) => Err(StorageError::Injected(format!("{stage:?} failed"))),
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

/// Ledger backend that keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a wallet for `user_id`, funded through a deposit entry.
    pub fn seed_wallet(&self, user_id: UserId, opening_balance: Decimal) -> Wallet {
        let mut wallet = Wallet::new(user_id, Decimal::ZERO);
        let mut ledger = Vec::new();

        if !opening_balance.is_zero() {
            let deposit = Transaction::deposit(wallet.id, wallet.balance, opening_balance);
            wallet.balance = deposit.balance;
            ledger.push(deposit);
        }

        let mut state = self.inner.state.write();
        state.wallets.insert(wallet.id, wallet.clone());
        state.ledgers.insert(wallet.id, ledger);

        wallet
    }

    /// All committed entries of a wallet, in commit order.
    pub fn ledger(&self, wallet_id: WalletId) -> Vec<Transaction> {
        self.inner
            .state
            .read()
            .ledgers
            .get(&wallet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All committed transfers, in commit order.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.inner.state.read().transfers.clone()
    }

    /// Committed entries referencing a transfer.
    pub fn entries_for_transfer(&self, transfer_id: TransferId) -> Vec<Transaction> {
        self.inner
            .state
            .read()
            .ledgers
            .values()
            .flatten()
            .filter(|e| e.reference_id == Some(transfer_id))
            .cloned()
            .collect()
    }

    /// All wallets.
    pub fn wallets(&self) -> Vec<Wallet> {
        self.inner.state.read().wallets.values().cloned().collect()
    }

    /// Make `stage` misbehave until cleared.
    pub fn inject_fault(&self, stage: Stage, fault: Fault) {
        self.inner.faults.insert(stage, fault);
    }

    /// Remove the fault on `stage`.
    pub fn clear_fault(&self, stage: Stage) {
        self.inner.faults.remove(&stage);
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.inner.faults.clear();
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_wallet(&self, id: WalletId) -> StorageResult<Option<Wallet>> {
        Ok(self.inner.state.read().wallets.get(&id).cloned())
    }

    async fn find_wallets(&self, ids: &[WalletId]) -> StorageResult<HashMap<WalletId, Wallet>> {
        let state = self.inner.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.wallets.get(id).map(|w| (*id, w.clone())))
            .collect())
    }

    async fn list_transactions(
        &self,
        wallet_id: WalletId,
        options: &ListOptions,
    ) -> StorageResult<TransactionList> {
        let mut entries = self.ledger(wallet_id);
        entries.sort_by(|a, b| options.order.compare(a, b));

        let start = match options.from_id {
            None => 0,
            Some(from_id) => match entries.iter().position(|e| e.id == from_id) {
                Some(index) => index,
                None => return Ok(TransactionList::default()),
            },
        };

        let rows = entries
            .into_iter()
            .skip(start)
            .take(options.fetch_limit())
            .collect();

        Ok(TransactionList::from_rows(rows, options.per_page))
    }

    async fn begin(&self) -> StorageResult<Box<dyn UnitOfWork>> {
        self.inner.checkpoint(Stage::Begin).await?;
        Ok(Box::new(MemoryUnit::new(self.inner.clone())))
    }
}

/// Unit of work over a [`MemoryStore`]. Writes are buffered until commit.
struct MemoryUnit {
    inner: Arc<Inner>,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: HashSet<WalletId>,
    balances: HashMap<WalletId, Decimal>,
    entries: Vec<Transaction>,
    transfers: Vec<Transfer>,
}

impl MemoryUnit {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            guards: Vec::new(),
            locked: HashSet::new(),
            balances: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
        }
    }

    fn row_lock(&self, id: WalletId) -> Arc<Mutex<()>> {
        Arc::clone(self.inner.row_locks.entry(id).or_default().value())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn lock_wallets(&mut self, ids: &[WalletId]) -> StorageResult<HashMap<WalletId, Wallet>> {
        self.inner.checkpoint(Stage::LockWallets).await?;

        let mut ordered: Vec<WalletId> = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        for id in &ordered {
            let exists = self.inner.state.read().wallets.contains_key(id);
            if !exists || self.locked.contains(id) {
                continue;
            }
            let guard = self.row_lock(*id).lock_owned().await;
            self.guards.push(guard);
            self.locked.insert(*id);
            debug!(wallet_id = %id, "Wallet row locked");
        }

        let state = self.inner.state.read();
        Ok(ordered
            .iter()
            .filter_map(|id| {
                state.wallets.get(id).map(|wallet| {
                    let mut wallet = wallet.clone();
                    if let Some(balance) = self.balances.get(id) {
                        wallet.balance = *balance;
                    }
                    (*id, wallet)
                })
            })
            .collect())
    }

    async fn insert_transfer(&mut self, transfer: &Transfer) -> StorageResult<Transfer> {
        self.inner.checkpoint(Stage::InsertTransfer).await?;

        let mut transfer = transfer.clone();
        transfer.created_at = now();
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn insert_transaction(&mut self, entry: &Transaction) -> StorageResult<Transaction> {
        self.inner.checkpoint(Stage::InsertTransaction).await?;

        let mut entry = entry.clone();
        entry.created_at = now();
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn update_balance(&mut self, id: WalletId, balance: Decimal) -> StorageResult<()> {
        self.inner.checkpoint(Stage::UpdateBalance).await?;

        if !self.locked.contains(&id) {
            return Err(StorageError::Transaction(format!(
                "wallet {id} is not locked by this unit of work"
            )));
        }
        self.balances.insert(id, balance);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.inner.checkpoint(Stage::Commit).await?;

        let unit = *self;
        {
            let mut state = unit.inner.state.write();
            for (id, balance) in &unit.balances {
                if let Some(wallet) = state.wallets.get_mut(id) {
                    wallet.balance = *balance;
                }
            }
            for entry in unit.entries {
                state.ledgers.entry(entry.wallet_id).or_default().push(entry);
            }
            state.transfers.extend(unit.transfers);
        }

        // Row locks are released only after the new balances are published.
        drop(unit.guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        let result = self.inner.checkpoint(Stage::Rollback).await;
        drop(self);
        result
    }
}
