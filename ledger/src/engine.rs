//! Transfer engine.
//!
//! A transfer runs inside one unit of work: both wallets are locked and read
//! with a single batched call, the business rules are checked against those
//! fresh balances, then the transfer record, both ledger legs and both new
//! balances are written and committed together. Any failure rolls the unit
//! back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use walletcore_common::Deadline;

use crate::access::{AccessPolicy, OwnershipPolicy, Resource};
use crate::config::LedgerConfig;
use crate::error::{ErrorKind, LedgerError, LedgerResult};
use crate::journal::TransferLegs;
use crate::metrics::EngineMetrics;
use crate::store::{LedgerStore, UnitOfWork};
use crate::transfer::{Transfer, TransferRequest};

/// Moves funds between two wallets atomically.
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    policy: Arc<dyn AccessPolicy>,
    transfer_timeout: Duration,
    metrics: Arc<EngineMetrics>,
}

impl TransferEngine {
    /// Create an engine enforcing wallet ownership.
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self::with_policy(store, Arc::new(OwnershipPolicy), config)
    }

    /// Create an engine with a custom access policy.
    pub fn with_policy(
        store: Arc<dyn LedgerStore>,
        policy: Arc<dyn AccessPolicy>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            store,
            policy,
            transfer_timeout: config.transfer_timeout,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Engine counters.
    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    /// Transfer funds within the configured transfer timeout.
    pub async fn create_transfer(&self, request: TransferRequest) -> LedgerResult<Transfer> {
        let deadline = Deadline::after(self.transfer_timeout);
        self.create_transfer_until(request, deadline).await
    }

    /// Transfer funds, giving up and rolling back once `deadline` passes.
    ///
    /// Dropping the returned future before it resolves abandons the unit of
    /// work, which discards its writes.
    #[instrument(
        skip(self, request, deadline),
        fields(
            origin = %request.origin_wallet_id,
            destination = %request.destination_wallet_id,
            amount = %request.amount,
        )
    )]
    pub async fn create_transfer_until(
        &self,
        request: TransferRequest,
        deadline: Deadline,
    ) -> LedgerResult<Transfer> {
        let in_flight = self.metrics.transfer_started();

        let result = self.execute(&request, deadline).await;

        match &result {
            Ok(transfer) => {
                in_flight.committed();
                info!(transfer_id = %transfer.id, "Transfer committed");
            }
            Err(err) if is_rejection(err) => {
                in_flight.rejected();
                warn!(code = err.error_code(), error = %err, "Transfer rejected");
            }
            Err(err) => {
                in_flight.failed();
                error!(code = err.error_code(), error = %err, "Transfer failed");
            }
        }

        result
    }

    async fn execute(&self, request: &TransferRequest, deadline: Deadline) -> LedgerResult<Transfer> {
        validate(request)?;

        let mut unit = bounded(deadline, self.store.begin()).await?;

        let outcome = bounded(deadline, self.apply(&mut *unit, request)).await;

        match outcome {
            Ok(_) if deadline.is_expired() => Err(self.abort(unit, LedgerError::DeadlineExceeded).await),
            Ok(transfer) => {
                unit.commit().await?;
                Ok(transfer)
            }
            Err(err) => Err(self.abort(unit, err).await),
        }
    }

    async fn apply(
        &self,
        unit: &mut dyn UnitOfWork,
        request: &TransferRequest,
    ) -> LedgerResult<Transfer> {
        let origin_id = request.origin_wallet_id;
        let destination_id = request.destination_wallet_id;

        let wallets = unit.lock_wallets(&[origin_id, destination_id]).await?;

        let origin = wallets.get(&origin_id).ok_or_else(|| {
            debug!(wallet_id = %origin_id, "Origin wallet not found");
            LedgerError::WalletNotFound(origin_id)
        })?;
        let destination = wallets.get(&destination_id).ok_or_else(|| {
            debug!(wallet_id = %destination_id, "Destination wallet not found");
            LedgerError::WalletNotFound(destination_id)
        })?;

        if !self.policy.can_write(&request.actor, Resource::Wallet(origin)) {
            return Err(LedgerError::AccessDenied {
                user_id: request.actor.id,
                wallet_id: origin_id,
            });
        }

        if !origin.has_sufficient_funds(request.amount) {
            return Err(LedgerError::InsufficientFunds {
                wallet_id: origin_id,
                available: origin.balance,
                required: request.amount,
            });
        }

        let transfer = unit.insert_transfer(&Transfer::from_request(request)).await?;

        let legs = TransferLegs::new(transfer.id, origin, destination, request.amount);
        debug_assert!(legs.is_balanced());

        for leg in legs.iter() {
            let entry = unit.insert_transaction(leg).await?;
            unit.update_balance(entry.wallet_id, entry.balance).await?;
            debug!(
                entry_id = %entry.id,
                wallet_id = %entry.wallet_id,
                created_at = %entry.created_at,
                "Ledger entry written"
            );
        }

        Ok(transfer)
    }

    /// Roll the unit back, folding a rollback failure into `cause`.
    async fn abort(&self, unit: Box<dyn UnitOfWork>, cause: LedgerError) -> LedgerError {
        match unit.rollback().await {
            Ok(()) => {
                self.metrics.rolled_back(true);
                cause
            }
            Err(rollback) => {
                self.metrics.rolled_back(false);
                error!(cause = %cause, error = %rollback, "Rollback failed");
                cause.with_rollback_failure(rollback)
            }
        }
    }
}

/// Checks that need no storage access.
pub(crate) fn validate(request: &TransferRequest) -> LedgerResult<()> {
    if request.amount.is_sign_negative() || request.amount.is_zero() {
        return Err(LedgerError::InvalidAmount(request.amount));
    }

    if request.origin_wallet_id == request.destination_wallet_id {
        return Err(LedgerError::SameWallets(request.origin_wallet_id));
    }

    Ok(())
}

fn is_rejection(err: &LedgerError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::InvalidAmount
            | ErrorKind::SameWallets
            | ErrorKind::WalletNotFound
            | ErrorKind::AccessDenied
            | ErrorKind::InsufficientFunds
    )
}

/// Run `fut` unless `deadline` passes first.
async fn bounded<T, E, F>(deadline: Deadline, fut: F) -> LedgerResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<LedgerError>,
{
    match tokio::time::timeout_at(deadline.instant(), fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(LedgerError::DeadlineExceeded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use walletcore_common::{Actor, UserId, WalletId};

    fn request(amount: Decimal) -> TransferRequest {
        TransferRequest::new(
            Actor::member(UserId::new()),
            WalletId::new(),
            WalletId::new(),
            amount,
        )
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate(&request(dec!(0.01))).is_ok());
        assert!(matches!(
            validate(&request(Decimal::ZERO)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate(&request(dec!(-5))),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_validate_amount_checked_before_same_wallets() {
        let wallet_id = WalletId::new();
        let mut req = request(Decimal::ZERO);
        req.destination_wallet_id = wallet_id;
        req.origin_wallet_id = wallet_id;

        assert_eq!(validate(&req).unwrap_err().kind(), ErrorKind::InvalidAmount);

        req.amount = Decimal::ONE;
        assert_eq!(validate(&req).unwrap_err().kind(), ErrorKind::SameWallets);
    }

    #[tokio::test]
    async fn test_create_transfer_example() {
        let store = MemoryStore::new();
        let owner = Actor::member(UserId::new());
        let origin = store.seed_wallet(owner.id, dec!(20.00));
        let destination = store.seed_wallet(UserId::new(), dec!(5.00));
        let engine = TransferEngine::new(Arc::new(store.clone()), &LedgerConfig::default());

        let transfer = engine
            .create_transfer(
                TransferRequest::new(owner.clone(), origin.id, destination.id, dec!(12.75))
                    .with_message("rent"),
            )
            .await
            .unwrap();

        assert_eq!(transfer.issuer_id, owner.id);
        assert_eq!(transfer.amount, dec!(12.75));
        assert_eq!(transfer.message.as_deref(), Some("rent"));

        let origin_after = store.get_wallet(origin.id).await.unwrap().unwrap();
        let destination_after = store.get_wallet(destination.id).await.unwrap().unwrap();
        assert_eq!(origin_after.balance, dec!(7.25));
        assert_eq!(destination_after.balance, dec!(17.75));

        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.transfers_committed, 1);
        assert_eq!(metrics.transfers_active, 0);
    }
}
