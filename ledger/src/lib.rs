//! walletcore Ledger
//!
//! Wallet balances, an append-only ledger per wallet, and a transfer engine
//! that moves funds between two wallets atomically.

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod memory;
pub mod metrics;
pub mod pagination;
pub mod postgres;
pub mod service;
pub mod store;
pub mod transfer;
pub mod wallet;

pub use access::{AccessPolicy, AdminOverridePolicy, OwnershipPolicy, Resource};
pub use config::{LedgerConfig, PaginationConfig};
pub use engine::TransferEngine;
pub use error::{ErrorKind, LedgerError, LedgerResult, StorageError, StorageResult};
pub use journal::{Transaction, TransactionType, TransferLegs};
pub use memory::{Fault, MemoryStore, Stage};
pub use metrics::{EngineMetrics, InFlight, MetricsSnapshot};
pub use pagination::{ListOptions, ListOrder, TransactionList};
pub use postgres::PgStore;
pub use service::WalletService;
pub use store::{LedgerStore, UnitOfWork};
pub use transfer::{Transfer, TransferRequest};
pub use wallet::Wallet;
