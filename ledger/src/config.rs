//! Ledger configuration.

use std::time::Duration;

use walletcore_common::time::constants::{DEFAULT_TRANSFER_TIMEOUT, MAX_TRANSFER_TIMEOUT};

/// Listing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Page size used when the caller does not ask for one.
    pub default_per_page: usize,
    /// Largest page size a caller may ask for.
    pub max_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 50,
        }
    }
}

/// Main ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Database URL for the Postgres backend.
    pub database_url: String,
    /// Connection pool size.
    pub max_connections: u32,
    /// Budget for one transfer when the caller supplies no deadline.
    pub transfer_timeout: Duration,
    /// Listing configuration.
    pub pagination: PaginationConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/walletcore".to_string(),
            max_connections: 10,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            pagination: PaginationConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(value) = std::env::var("LEDGER_MAX_CONNECTIONS") {
            if let Ok(max) = value.parse() {
                config.max_connections = max;
            }
        }

        if let Ok(value) = std::env::var("LEDGER_TRANSFER_TIMEOUT_MS") {
            if let Ok(ms) = value.parse() {
                config.transfer_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(value) = std::env::var("LEDGER_DEFAULT_PER_PAGE") {
            if let Ok(per_page) = value.parse() {
                config.pagination.default_per_page = per_page;
            }
        }

        if let Ok(value) = std::env::var("LEDGER_MAX_PER_PAGE") {
            if let Ok(per_page) = value.parse() {
                config.pagination.max_per_page = per_page;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("Max connections cannot be 0".to_string());
        }

        if self.transfer_timeout.is_zero() || self.transfer_timeout > MAX_TRANSFER_TIMEOUT {
            return Err(format!(
                "Transfer timeout must be between 1ms and {}s",
                MAX_TRANSFER_TIMEOUT.as_secs()
            ));
        }

        if self.pagination.default_per_page == 0 {
            return Err("Default page size cannot be 0".to_string());
        }

        if self.pagination.default_per_page > self.pagination.max_per_page {
            return Err("Default page size cannot exceed max page size".to_string());
        }

        Ok(())
    }
}
