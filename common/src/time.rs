//! Time utilities for walletcore.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Timing defaults.
pub mod constants {
    use std::time::Duration;

    /// Default budget for one transfer, lock acquisition through commit (5 seconds).
    pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

    /// Upper bound accepted for a configured transfer budget (60 seconds).
    pub const MAX_TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Point in time by which an operation must finish.
///
/// Built on the tokio clock so it can be handed straight to
/// `tokio::time::timeout_at` and honors paused time in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// Deadline at an explicit instant.
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// The underlying tokio instant.
    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Check if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}
