//! walletcore Common Types
//!
//! Shared identifiers, the actor model and time helpers used across the
//! wallet ledger crates.

pub mod actor;
pub mod identifiers;
pub mod time;

pub use actor::*;
pub use identifiers::*;
pub use time::*;
