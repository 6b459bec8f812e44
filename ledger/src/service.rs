//! Wallet service: the contract offered to transport layers.

use std::sync::Arc;

use tracing::instrument;

use walletcore_common::{Actor, Deadline, WalletId};

use crate::access::{AccessPolicy, OwnershipPolicy, Resource};
use crate::config::{LedgerConfig, PaginationConfig};
use crate::engine::{validate, TransferEngine};
use crate::error::{LedgerError, LedgerResult};
use crate::metrics::EngineMetrics;
use crate::pagination::{ListOptions, TransactionList};
use crate::store::LedgerStore;
use crate::transfer::{Transfer, TransferRequest};
use crate::wallet::Wallet;

/// Wallet lookups, transfers and ledger listings on behalf of an actor.
pub struct WalletService {
    store: Arc<dyn LedgerStore>,
    policy: Arc<dyn AccessPolicy>,
    engine: TransferEngine,
    pagination: PaginationConfig,
}

impl WalletService {
    /// Create a service enforcing wallet ownership.
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self::with_policy(store, Arc::new(OwnershipPolicy), config)
    }

    /// Create a service with a custom access policy.
    pub fn with_policy(
        store: Arc<dyn LedgerStore>,
        policy: Arc<dyn AccessPolicy>,
        config: &LedgerConfig,
    ) -> Self {
        let engine = TransferEngine::with_policy(store.clone(), policy.clone(), config);
        Self {
            store,
            policy,
            engine,
            pagination: config.pagination,
        }
    }

    /// Transfer engine counters.
    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.engine.metrics()
    }

    /// Get a wallet the actor may read.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn get_wallet(&self, actor: &Actor, wallet_id: WalletId) -> LedgerResult<Wallet> {
        let wallet = self
            .store
            .get_wallet(wallet_id)
            .await?
            .ok_or(LedgerError::WalletNotFound(wallet_id))?;

        if !self.policy.can_read(actor, Resource::Wallet(&wallet)) {
            return Err(LedgerError::AccessDenied {
                user_id: actor.id,
                wallet_id,
            });
        }

        Ok(wallet)
    }

    /// Transfer funds between two distinct wallets.
    #[instrument(
        skip(self, request),
        fields(user_id = %request.actor.id, origin = %request.origin_wallet_id, destination = %request.destination_wallet_id)
    )]
    pub async fn transfer_funds(&self, request: TransferRequest) -> LedgerResult<Transfer> {
        validate(&request)?;
        self.engine.create_transfer(request).await
    }

    /// Transfer funds, bounded by the caller's deadline.
    #[instrument(
        skip(self, request, deadline),
        fields(user_id = %request.actor.id, origin = %request.origin_wallet_id, destination = %request.destination_wallet_id)
    )]
    pub async fn transfer_funds_until(
        &self,
        request: TransferRequest,
        deadline: Deadline,
    ) -> LedgerResult<Transfer> {
        validate(&request)?;
        self.engine.create_transfer_until(request, deadline).await
    }

    /// List one page of a wallet's ledger.
    ///
    /// A `per_page` of zero selects the configured default.
    #[instrument(skip(self, actor, options), fields(user_id = %actor.id, order = %options.order))]
    pub async fn list_transactions(
        &self,
        actor: &Actor,
        wallet_id: WalletId,
        options: ListOptions,
    ) -> LedgerResult<TransactionList> {
        let options = options.normalized(&self.pagination)?;

        self.get_wallet(actor, wallet_id).await?;

        Ok(self.store.list_transactions(wallet_id, &options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AdminOverridePolicy;
    use crate::error::ErrorKind;
    use crate::memory::MemoryStore;
    use crate::pagination::ListOrder;
    use rust_decimal_macros::dec;
    use walletcore_common::UserId;

    fn service(store: &MemoryStore) -> WalletService {
        WalletService::new(Arc::new(store.clone()), &LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_get_wallet_checks_ownership() {
        let store = MemoryStore::new();
        let owner = Actor::member(UserId::new());
        let wallet = store.seed_wallet(owner.id, dec!(10));
        let service = service(&store);

        let seen = service.get_wallet(&owner, wallet.id).await.unwrap();
        assert_eq!(seen.balance, dec!(10));

        let stranger = Actor::member(UserId::new());
        let err = service.get_wallet(&stranger, wallet.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        let err = service.get_wallet(&owner, WalletId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WalletNotFound);
    }

    #[tokio::test]
    async fn test_admin_override_reads_any_wallet() {
        let store = MemoryStore::new();
        let wallet = store.seed_wallet(UserId::new(), dec!(10));
        let service = WalletService::with_policy(
            Arc::new(store.clone()),
            Arc::new(AdminOverridePolicy),
            &LedgerConfig::default(),
        );

        let admin = Actor::admin(UserId::new());
        assert!(service.get_wallet(&admin, wallet.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_transfer_funds_rejects_before_engine() {
        let store = MemoryStore::new();
        let owner = Actor::member(UserId::new());
        let wallet = store.seed_wallet(owner.id, dec!(10));
        let service = service(&store);

        let err = service
            .transfer_funds(TransferRequest::new(owner, wallet.id, wallet.id, dec!(1)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SameWallets);
        assert_eq!(service.metrics().snapshot().transfers_total, 0);
    }

    #[tokio::test]
    async fn test_transfer_funds_until_commits_within_deadline() {
        let store = MemoryStore::new();
        let owner = Actor::member(UserId::new());
        let origin = store.seed_wallet(owner.id, dec!(10));
        let destination = store.seed_wallet(UserId::new(), dec!(0));
        let service = service(&store);

        let transfer = service
            .transfer_funds_until(
                TransferRequest::new(owner.clone(), origin.id, destination.id, dec!(3)),
                Deadline::after(std::time::Duration::from_secs(5)),
            )
            .await
            .unwrap();
        assert_eq!(transfer.issuer_id, owner.id);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.transfers_committed, 1);
        assert_eq!(snapshot.transfers_active, 0);
        assert_eq!(service.get_wallet(&owner, origin.id).await.unwrap().balance, dec!(7));
    }

    #[tokio::test]
    async fn test_list_transactions_validates_options_first() {
        let store = MemoryStore::new();
        let service = service(&store);
        let actor = Actor::member(UserId::new());

        let err = service
            .list_transactions(&actor, WalletId::new(), ListOptions::first(ListOrder::Ascending, 51))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidListOptions);
    }

    #[tokio::test]
    async fn test_list_transactions_defaults_page_size() {
        let store = MemoryStore::new();
        let owner = Actor::member(UserId::new());
        let wallet = store.seed_wallet(owner.id, dec!(10));
        let service = service(&store);

        let page = service
            .list_transactions(&owner, wallet.id, ListOptions::first(ListOrder::Descending, 0))
            .await
            .unwrap();

        assert_eq!(page.results.len(), 1);
        assert!(page.is_last_page());

        let stranger = Actor::member(UserId::new());
        let err = service
            .list_transactions(&stranger, wallet.id, ListOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}
