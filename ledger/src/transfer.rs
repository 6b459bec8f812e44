//! Transfer request and record types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use walletcore_common::{now, Actor, Timestamp, TransferId, UserId, WalletId};

/// A request to move funds from one wallet to another.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Who issues the transfer.
    pub actor: Actor,
    /// Wallet to debit.
    pub origin_wallet_id: WalletId,
    /// Wallet to credit.
    pub destination_wallet_id: WalletId,
    /// Amount to move, must be positive.
    pub amount: Decimal,
    /// Optional free-text message.
    pub message: Option<String>,
}

impl TransferRequest {
    /// Create a request without a message.
    pub fn new(
        actor: Actor,
        origin_wallet_id: WalletId,
        destination_wallet_id: WalletId,
        amount: Decimal,
    ) -> Self {
        Self {
            actor,
            origin_wallet_id,
            destination_wallet_id,
            amount,
            message: None,
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique transfer ID, also the reference id of both ledger legs.
    pub id: TransferId,
    /// User who issued the transfer.
    pub issuer_id: UserId,
    /// Debited wallet.
    pub origin_wallet_id: WalletId,
    /// Credited wallet.
    pub destination_wallet_id: WalletId,
    /// Amount moved.
    pub amount: Decimal,
    /// Optional message.
    pub message: Option<String>,
    /// Server-assigned creation time.
    pub created_at: Timestamp,
}

impl Transfer {
    /// Materialize a transfer record from a validated request.
    pub fn from_request(request: &TransferRequest) -> Self {
        Self {
            id: TransferId::new(),
            issuer_id: request.actor.id,
            origin_wallet_id: request.origin_wallet_id,
            destination_wallet_id: request.destination_wallet_id,
            amount: request.amount,
            message: request.message.clone(),
            created_at: now(),
        }
    }
}
