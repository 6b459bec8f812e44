//! Capability checks against ownable resources.

use walletcore_common::{Actor, UserId};

use crate::wallet::Wallet;

/// A resource that access policies can reason about.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Wallet(&'a Wallet),
}

impl Resource<'_> {
    /// The user that owns the resource.
    pub fn owner_id(&self) -> UserId {
        match self {
            Resource::Wallet(wallet) => wallet.user_id,
        }
    }

    /// Check if the actor owns the resource.
    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.owner_id() == actor.id
    }
}

impl<'a> From<&'a Wallet> for Resource<'a> {
    fn from(wallet: &'a Wallet) -> Self {
        Resource::Wallet(wallet)
    }
}

/// Decides what an actor may do with a resource.
pub trait AccessPolicy: Send + Sync {
    /// Check read access.
    fn can_read(&self, actor: &Actor, resource: Resource<'_>) -> bool;

    /// Check write access.
    fn can_write(&self, actor: &Actor, resource: Resource<'_>) -> bool;
}

/// Owners may read and write their own resources, nobody else may.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipPolicy;

impl AccessPolicy for OwnershipPolicy {
    fn can_read(&self, actor: &Actor, resource: Resource<'_>) -> bool {
        resource.is_owned_by(actor)
    }

    fn can_write(&self, actor: &Actor, resource: Resource<'_>) -> bool {
        resource.is_owned_by(actor)
    }
}

/// Ownership, plus full access for admins.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminOverridePolicy;

impl AccessPolicy for AdminOverridePolicy {
    fn can_read(&self, actor: &Actor, resource: Resource<'_>) -> bool {
        actor.is_admin() || resource.is_owned_by(actor)
    }

    fn can_write(&self, actor: &Actor, resource: Resource<'_>) -> bool {
        actor.is_admin() || resource.is_owned_by(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_ownership_policy() {
        let owner = Actor::member(UserId::new());
        let stranger = Actor::member(UserId::new());
        let admin = Actor::admin(UserId::new());
        let wallet = Wallet::new(owner.id, Decimal::ZERO);

        let policy = OwnershipPolicy;
        assert!(policy.can_write(&owner, (&wallet).into()));
        assert!(policy.can_read(&owner, (&wallet).into()));
        assert!(!policy.can_write(&stranger, (&wallet).into()));
        assert!(!policy.can_write(&admin, (&wallet).into()));
    }

    #[test]
    fn test_admin_override_policy() {
        let owner = Actor::member(UserId::new());
        let stranger = Actor::member(UserId::new());
        let admin = Actor::admin(UserId::new());
        let wallet = Wallet::new(owner.id, Decimal::ZERO);

        let policy = AdminOverridePolicy;
        assert!(policy.can_write(&owner, Resource::Wallet(&wallet)));
        assert!(policy.can_write(&admin, Resource::Wallet(&wallet)));
        assert!(policy.can_read(&admin, Resource::Wallet(&wallet)));
        assert!(!policy.can_read(&stranger, Resource::Wallet(&wallet)));
    }
}
