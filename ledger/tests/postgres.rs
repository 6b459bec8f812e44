//! PostgreSQL backend tests.
//!
//! These need a live database: set `DATABASE_URL` and run with
//! `cargo test -p walletcore-ledger -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use walletcore_common::{Actor, TransactionId, UserId};
use walletcore_ledger::{
    ErrorKind, LedgerConfig, LedgerStore, ListOptions, ListOrder, PgStore, Transaction,
    TransferRequest, UnitOfWork, WalletService,
};

async fn store() -> PgStore {
    let config = LedgerConfig::from_env();
    let store = PgStore::connect(&config).await.unwrap();
    store.install_schema().await.unwrap();
    store
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_transfer_and_listing() {
    let store = store().await;
    let owner = Actor::member(UserId::new());
    let origin = store.seed_wallet(owner.id, dec!(20.00)).await.unwrap();
    let destination = store.seed_wallet(UserId::new(), dec!(5.00)).await.unwrap();
    let service = WalletService::new(Arc::new(store.clone()), &LedgerConfig::default());

    let transfer = service
        .transfer_funds(TransferRequest::new(owner.clone(), origin.id, destination.id, dec!(12.75)))
        .await
        .unwrap();

    let wallet = service.get_wallet(&owner, origin.id).await.unwrap();
    assert_eq!(wallet.balance, dec!(7.25));
    let other = store.get_wallet(destination.id).await.unwrap().unwrap();
    assert_eq!(other.balance, dec!(17.75));

    let page = service
        .list_transactions(&owner, origin.id, ListOptions::first(ListOrder::Descending, 1))
        .await
        .unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].reference_id, Some(transfer.id));
    assert_eq!(page.results[0].amount, dec!(-12.75));

    let rest = service
        .list_transactions(
            &owner,
            origin.id,
            ListOptions::first(ListOrder::Descending, 1).starting_at(page.next_id),
        )
        .await
        .unwrap();
    assert_eq!(rest.results[0].amount, dec!(20.00));
    assert!(rest.is_last_page());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_rejection_rolls_back() {
    let store = store().await;
    let owner = Actor::member(UserId::new());
    let origin = store.seed_wallet(owner.id, dec!(1)).await.unwrap();
    let destination = store.seed_wallet(UserId::new(), Decimal::ZERO).await.unwrap();
    let service = WalletService::new(Arc::new(store.clone()), &LedgerConfig::default());

    let err = service
        .transfer_funds(TransferRequest::new(owner.clone(), origin.id, destination.id, dec!(2)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    let wallets = store.find_wallets(&[origin.id, destination.id]).await.unwrap();
    assert_eq!(wallets[&origin.id].balance, dec!(1));
    assert_eq!(wallets[&destination.id].balance, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_unknown_cursor() {
    let store = store().await;
    let owner = Actor::member(UserId::new());
    let wallet = store.seed_wallet(owner.id, dec!(3)).await.unwrap();

    let options = ListOptions::default().starting_at(Some(TransactionId::new()));
    let page = store.list_transactions(wallet.id, &options).await.unwrap();
    assert!(page.results.is_empty());
    assert!(page.is_last_page());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_entry_order_follows_lock_order() {
    let store = store().await;
    let owner = Actor::member(UserId::new());
    let wallet = store.seed_wallet(owner.id, dec!(10)).await.unwrap();
    let destination = store.seed_wallet(UserId::new(), Decimal::ZERO).await.unwrap();
    let service = WalletService::new(Arc::new(store.clone()), &LedgerConfig::default());

    // Opened first, but locks the wallet only after the transfer commits.
    let mut early = store.begin().await.unwrap();
    assert!(early.lock_wallets(&[]).await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(20)).await;

    service
        .transfer_funds(TransferRequest::new(owner.clone(), wallet.id, destination.id, dec!(4)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let locked = early.lock_wallets(&[wallet.id]).await.unwrap();
    let deposit = Transaction::deposit(wallet.id, locked[&wallet.id].balance, dec!(1));
    let entry = early.insert_transaction(&deposit).await.unwrap();
    early.update_balance(entry.wallet_id, entry.balance).await.unwrap();
    early.commit().await.unwrap();

    let page = store
        .list_transactions(wallet.id, &ListOptions::first(ListOrder::Ascending, 10))
        .await
        .unwrap();
    let amounts: Vec<_> = page.results.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![dec!(10), dec!(-4), dec!(1)]);

    let mut running = Decimal::ZERO;
    for entry in &page.results {
        running += entry.amount;
        assert_eq!(entry.balance, running);
    }
    let current = store.get_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(current.balance, dec!(7));
    assert_eq!(running, current.balance);
}
