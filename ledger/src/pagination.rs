//! Cursor pagination for wallet ledgers.
//!
//! Cursors are ledger entry ids and are inclusive: a page requested from
//! `from_id` starts with that entry. Backends fetch one row more than the page
//! size and hand the rows to [`TransactionList::from_rows`], which turns the
//! surplus row into the next cursor.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use walletcore_common::TransactionId;

use crate::config::PaginationConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::Transaction;

/// Listing direction over `(created_at, id)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

impl ListOrder {
    /// Check if the order is ascending.
    pub fn is_ascending(&self) -> bool {
        *self == ListOrder::Ascending
    }

    /// Check if the order is descending.
    pub fn is_descending(&self) -> bool {
        *self == ListOrder::Descending
    }

    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ListOrder::Ascending => "ASC",
            ListOrder::Descending => "DESC",
        }
    }

    /// Parse, falling back to ascending on anything unrecognized.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Compare two entries in this direction.
    pub fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let ord = a.sort_key().cmp(&b.sort_key());
        match self {
            ListOrder::Ascending => ord,
            ListOrder::Descending => ord.reverse(),
        }
    }
}

impl FromStr for ListOrder {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(ListOrder::Ascending),
            "desc" => Ok(ListOrder::Descending),
            _ => Err(LedgerError::InvalidListOptions(format!(
                "{s:?} is not a valid list order, valid values: asc, desc"
            ))),
        }
    }
}

impl fmt::Display for ListOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListOrder::Ascending => f.write_str("asc"),
            ListOrder::Descending => f.write_str("desc"),
        }
    }
}

/// Options for one page of a ledger listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// First entry of the page, inclusive.
    pub from_id: Option<TransactionId>,
    /// Direction.
    pub order: ListOrder,
    /// Maximum number of entries returned.
    pub per_page: usize,
}

impl ListOptions {
    /// First page in the given order.
    pub fn first(order: ListOrder, per_page: usize) -> Self {
        Self {
            from_id: None,
            order,
            per_page,
        }
    }

    /// The page that starts at `from_id`.
    pub fn starting_at(self, from_id: Option<TransactionId>) -> Self {
        Self { from_id, ..self }
    }

    /// Apply the configured default page size and reject oversized pages.
    ///
    /// A page size of zero means "not specified".
    pub fn normalized(self, config: &PaginationConfig) -> LedgerResult<Self> {
        let per_page = match self.per_page {
            0 => config.default_per_page,
            n if n > config.max_per_page => {
                return Err(LedgerError::InvalidListOptions(format!(
                    "per page must be between 1 and {}, got {n}",
                    config.max_per_page
                )))
            }
            n => n,
        };

        Ok(Self { per_page, ..self })
    }

    /// Rows a backend should fetch for this page.
    pub fn fetch_limit(&self) -> usize {
        self.per_page + 1
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::first(ListOrder::Ascending, PaginationConfig::default().default_per_page)
    }
}

/// One page of a wallet's ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionList {
    /// Entries on this page, in the requested order.
    pub results: Vec<Transaction>,
    /// First entry of the next page; absent on the last page.
    pub next_id: Option<TransactionId>,
}

impl TransactionList {
    /// Build a page from up to `per_page + 1` ordered rows.
    pub fn from_rows(mut rows: Vec<Transaction>, per_page: usize) -> Self {
        let next_id = if rows.len() > per_page {
            let next = rows[per_page].id;
            rows.truncate(per_page);
            Some(next)
        } else {
            None
        };

        Self {
            results: rows,
            next_id,
        }
    }

    /// Check if this is the last page.
    pub fn is_last_page(&self) -> bool {
        self.next_id.is_none()
    }
}
