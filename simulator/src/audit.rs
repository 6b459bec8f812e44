//! Post-run ledger audit.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

use walletcore_common::TransactionId;
use walletcore_ledger::{ListOptions, ListOrder, MemoryStore, WalletService};

use crate::holders::WalletHolder;

/// Result of auditing the ledger after a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub wallets_checked: usize,
    pub entries_checked: usize,
    pub transfers_checked: usize,
    pub total_balance: Decimal,
    pub expected_total: Decimal,
    pub violations: Vec<String>,
}

impl AuditReport {
    /// Check if no invariant was violated.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn violation(&mut self, message: String) {
        error!(violation = %message, "Audit violation");
        self.violations.push(message);
    }
}

/// Check every wallet and transfer in `store` against the ledger invariants.
pub async fn audit(
    store: &MemoryStore,
    service: &WalletService,
    holders: &[WalletHolder],
    expected_total: Decimal,
) -> anyhow::Result<AuditReport> {
    let mut report = AuditReport {
        expected_total,
        ..AuditReport::default()
    };

    for holder in holders {
        let wallet = service.get_wallet(&holder.actor, holder.wallet_id).await?;
        let ledger = store.ledger(wallet.id);
        report.wallets_checked += 1;
        report.entries_checked += ledger.len();
        report.total_balance += wallet.balance;

        if wallet.balance.is_sign_negative() {
            report.violation(format!("{}: negative balance {}", holder.name, wallet.balance));
        }
        if let Some(entry) = ledger.iter().find(|e| e.balance.is_sign_negative()) {
            report.violation(format!("{}: entry {} left balance {}", holder.name, entry.id, entry.balance));
        }

        let ledger_sum: Decimal = ledger.iter().map(|e| e.amount).sum();
        if ledger_sum != wallet.balance {
            report.violation(format!(
                "{}: balance {} differs from ledger sum {}",
                holder.name, wallet.balance, ledger_sum
            ));
        }

        let mut keys: Vec<_> = ledger.iter().map(|e| e.sort_key()).collect();
        keys.sort();
        let mut expected: Vec<TransactionId> = keys.into_iter().map(|(_, id)| id).collect();

        if let Some(last) = expected.last() {
            let latest = ledger.iter().find(|e| e.id == *last).map(|e| e.balance);
            if latest != Some(wallet.balance) {
                report.violation(format!(
                    "{}: latest entry balance {:?} differs from wallet balance {}",
                    holder.name, latest, wallet.balance
                ));
            }
        }

        let ascending = walk(service, holder, ListOrder::Ascending).await?;
        if ascending != expected {
            report.violation(format!("{}: ascending walk does not match ledger", holder.name));
        }

        expected.reverse();
        let descending = walk(service, holder, ListOrder::Descending).await?;
        if descending != expected {
            report.violation(format!("{}: descending walk does not match ledger", holder.name));
        }
    }

    for transfer in store.transfers() {
        report.transfers_checked += 1;
        let legs = store.entries_for_transfer(transfer.id);
        let net: Decimal = legs.iter().map(|e| e.amount).sum();
        if legs.len() != 2 || !net.is_zero() {
            report.violation(format!(
                "transfer {}: {} legs netting {}",
                transfer.id,
                legs.len(),
                net
            ));
        }
    }

    if report.total_balance != expected_total {
        report.violation(format!(
            "total balance {} differs from funded total {}",
            report.total_balance, expected_total
        ));
    }

    info!(
        wallets = report.wallets_checked,
        entries = report.entries_checked,
        transfers = report.transfers_checked,
        violations = report.violations.len(),
        "Audit complete"
    );

    Ok(report)
}

/// Page through a holder's ledger and collect the entry ids in order.
async fn walk(
    service: &WalletService,
    holder: &WalletHolder,
    order: ListOrder,
) -> anyhow::Result<Vec<TransactionId>> {
    let mut ids = Vec::new();
    let mut options = ListOptions::first(order, 0);

    loop {
        let page = service
            .list_transactions(&holder.actor, holder.wallet_id, options)
            .await?;
        ids.extend(page.results.iter().map(|e| e.id));

        match page.next_id {
            Some(next_id) => options = options.starting_at(Some(next_id)),
            None => return Ok(ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use walletcore_ledger::{LedgerConfig, TransferRequest};

    use crate::holders::HolderFactory;

    #[tokio::test]
    async fn test_clean_ledger_passes() {
        let store = MemoryStore::new();
        let holders = HolderFactory::create_holders(&store, 3, dec!(10));
        let service = WalletService::new(Arc::new(store.clone()), &LedgerConfig::default());

        for _ in 0..25 {
            service
                .transfer_funds(TransferRequest::new(
                    holders[0].actor.clone(),
                    holders[0].wallet_id,
                    holders[1].wallet_id,
                    dec!(0.10),
                ))
                .await
                .unwrap();
        }

        let report = audit(&store, &service, &holders, dec!(30)).await.unwrap();
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.transfers_checked, 25);
        assert_eq!(report.entries_checked, 3 + 50);
    }

    #[tokio::test]
    async fn test_money_leak_is_reported() {
        let store = MemoryStore::new();
        let holders = HolderFactory::create_holders(&store, 2, dec!(10));
        let service = WalletService::new(Arc::new(store.clone()), &LedgerConfig::default());

        let report = audit(&store, &service, &holders, dec!(25)).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.total_balance, dec!(20));
    }
}
