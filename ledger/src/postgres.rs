//! PostgreSQL ledger backend.
//!
//! A unit of work is one database transaction. `lock_wallets` takes row locks
//! with `SELECT ... FOR UPDATE` ordered by id, so two transfers touching the
//! same pair of wallets always lock them in the same order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

use walletcore_common::{UserId, WalletId};

use crate::config::LedgerConfig;
use crate::error::{StorageError, StorageResult};
use crate::journal::Transaction;
use crate::pagination::{ListOptions, TransactionList};
use crate::store::{LedgerStore, UnitOfWork};
use crate::transfer::Transfer;
use crate::wallet::Wallet;

/// Table definitions, applied by [`PgStore::install_schema`].
pub const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Ledger backend over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the database settings in `config`.
    pub async fn connect(config: &LedgerConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to ledger database");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger tables if they do not exist.
    pub async fn install_schema(&self) -> StorageResult<()> {
        self.pool.execute(SCHEMA).await?;
        Ok(())
    }

    /// Provision a wallet for `user_id`, funded through a deposit entry.
    pub async fn seed_wallet(&self, user_id: UserId, opening_balance: Decimal) -> StorageResult<Wallet> {
        let mut tx = self.pool.begin().await?;

        let wallet = Wallet::new(user_id, opening_balance);
        sqlx::query("INSERT INTO wallets (id, user_id, balance) VALUES ($1, $2, $3)")
            .bind(*wallet.id.as_uuid())
            .bind(*user_id.as_uuid())
            .bind(wallet.balance)
            .execute(&mut *tx)
            .await?;

        if !opening_balance.is_zero() {
            let deposit = Transaction::deposit(wallet.id, Decimal::ZERO, opening_balance);
            insert_transaction(&mut tx, &deposit).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        Ok(wallet)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn get_wallet(&self, id: WalletId) -> StorageResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, balance FROM wallets WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(WalletRow::into_model))
    }

    async fn find_wallets(&self, ids: &[WalletId]) -> StorageResult<HashMap<WalletId, Wallet>> {
        let rows = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, balance FROM wallets WHERE id = ANY($1)",
        )
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(into_wallet_map(rows))
    }

    async fn list_transactions(
        &self,
        wallet_id: WalletId,
        options: &ListOptions,
    ) -> StorageResult<TransactionList> {
        let direction = options.order.as_sql();
        let (comparison, cursor) = match options.from_id {
            None => ("", ""),
            Some(_) if options.order.is_ascending() => (">=", CURSOR_CLAUSE),
            Some(_) => ("<=", CURSOR_CLAUSE),
        };

        let query = format!(
            r#"
            SELECT id, wallet_id, amount, balance, transaction_type, reference_id, created_at
            FROM transactions
            WHERE wallet_id = $1 {}
            ORDER BY created_at {}, id {}
            LIMIT $2
            "#,
            cursor.replace("{cmp}", comparison),
            direction,
            direction
        );

        let mut q = sqlx::query_as::<_, TransactionRow>(&query)
            .bind(*wallet_id.as_uuid())
            .bind(options.fetch_limit() as i64);
        if let Some(from_id) = options.from_id {
            q = q.bind(*from_id.as_uuid());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TransactionRow::into_model)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(TransactionList::from_rows(rows, options.per_page))
    }

    async fn begin(&self) -> StorageResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }
}

/// Row comparison against the cursor entry. Yields no rows when the cursor
/// is not an entry of this wallet, since the subquery is then NULL.
const CURSOR_CLAUSE: &str = "AND (created_at, id) {cmp} \
    (SELECT c.created_at, c.id FROM transactions c WHERE c.id = $3 AND c.wallet_id = $1)";

/// Unit of work backed by one database transaction.
struct PgUnit {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn lock_wallets(&mut self, ids: &[WalletId]) -> StorageResult<HashMap<WalletId, Wallet>> {
        let rows = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, balance FROM wallets WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(uuids(ids))
        .fetch_all(&mut *self.tx)
        .await?;

        debug!(requested = ids.len(), locked = rows.len(), "Wallet rows locked");
        Ok(into_wallet_map(rows))
    }

    async fn insert_transfer(&mut self, transfer: &Transfer) -> StorageResult<Transfer> {
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO transfers (id, issuer_id, origin_wallet_id, destination_wallet_id, amount, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING created_at
            "#,
        )
        .bind(*transfer.id.as_uuid())
        .bind(*transfer.issuer_id.as_uuid())
        .bind(*transfer.origin_wallet_id.as_uuid())
        .bind(*transfer.destination_wallet_id.as_uuid())
        .bind(transfer.amount)
        .bind(transfer.message.as_deref())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Transfer {
            created_at,
            ..transfer.clone()
        })
    }

    async fn insert_transaction(&mut self, entry: &Transaction) -> StorageResult<Transaction> {
        insert_transaction(&mut self.tx, entry).await
    }

    async fn update_balance(&mut self, id: WalletId, balance: Decimal) -> StorageResult<()> {
        let result = sqlx::query("UPDATE wallets SET balance = $1 WHERE id = $2")
            .bind(balance)
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StorageError::Query(format!("wallet {id} not updated")));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))
    }
}

async fn insert_transaction(
    tx: &mut sqlx::Transaction<'static, Postgres>,
    entry: &Transaction,
) -> StorageResult<Transaction> {
    let created_at: DateTime<Utc> = sqlx::query_scalar(
        r#"
        INSERT INTO transactions (id, wallet_id, amount, balance, transaction_type, reference_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING created_at
        "#,
    )
    .bind(*entry.id.as_uuid())
    .bind(*entry.wallet_id.as_uuid())
    .bind(entry.amount)
    .bind(entry.balance)
    .bind(entry.kind.as_str())
    .bind(entry.reference_id.map(|id| *id.as_uuid()))
    .fetch_one(&mut **tx)
    .await?;

    Ok(Transaction {
        created_at,
        ..entry.clone()
    })
}

fn uuids(ids: &[WalletId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

fn into_wallet_map(rows: Vec<WalletRow>) -> HashMap<WalletId, Wallet> {
    rows.into_iter()
        .map(WalletRow::into_model)
        .map(|wallet| (wallet.id, wallet))
        .collect()
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: Uuid,
    balance: Decimal,
}

impl WalletRow {
    fn into_model(self) -> Wallet {
        Wallet {
            id: WalletId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            balance: self.balance,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    wallet_id: Uuid,
    amount: Decimal,
    balance: Decimal,
    transaction_type: String,
    reference_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_model(self) -> StorageResult<Transaction> {
        let kind = self
            .transaction_type
            .parse()
            .map_err(StorageError::Serialization)?;

        Ok(Transaction {
            id: self.id.into(),
            wallet_id: self.wallet_id.into(),
            amount: self.amount,
            balance: self.balance,
            kind,
            reference_id: self.reference_id.map(Into::into),
            created_at: self.created_at,
        })
    }
}
