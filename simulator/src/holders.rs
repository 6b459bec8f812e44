//! Simulated wallet holders.

use rust_decimal::Decimal;

use walletcore_common::{Actor, UserId, WalletId};
use walletcore_ledger::MemoryStore;

/// A user owning one funded wallet.
#[derive(Debug, Clone)]
pub struct WalletHolder {
    /// Display name used in logs.
    pub name: String,
    /// The owner, issuing transfers out of the wallet.
    pub actor: Actor,
    /// The holder's wallet.
    pub wallet_id: WalletId,
}

/// Creates funded holders in a store.
pub struct HolderFactory;

impl HolderFactory {
    /// Create `count` holders, each with a wallet opened at `initial_balance`.
    pub fn create_holders(
        store: &MemoryStore,
        count: usize,
        initial_balance: Decimal,
    ) -> Vec<WalletHolder> {
        let names = [
            "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
        ];

        (0..count)
            .map(|i| {
                let name = match names.get(i) {
                    Some(name) => name.to_string(),
                    None => format!("holder-{}", i + 1),
                };
                let actor = Actor::member(UserId::new());
                let wallet = store.seed_wallet(actor.id, initial_balance);

                WalletHolder {
                    name,
                    actor,
                    wallet_id: wallet.id,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_holders() {
        let store = MemoryStore::new();
        let holders = HolderFactory::create_holders(&store, 12, Decimal::from(100));

        assert_eq!(holders.len(), 12);
        assert_eq!(holders[0].name, "alice");
        assert_eq!(holders[11].name, "holder-12");
        assert_eq!(store.wallets().len(), 12);
        assert!(store
            .wallets()
            .iter()
            .all(|w| w.balance == Decimal::from(100)));
    }
}
