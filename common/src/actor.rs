//! The authenticated caller on whose behalf an operation runs.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Role granted to an actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular wallet holder.
    #[default]
    Member,
    /// Operator with access to every wallet under policies that honor it.
    Admin,
}

/// An authenticated user issuing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User identity.
    pub id: UserId,
    /// Granted role.
    pub role: Role,
}

impl Actor {
    /// Create a regular member actor.
    pub fn member(id: UserId) -> Self {
        Self {
            id,
            role: Role::Member,
        }
    }

    /// Create an admin actor.
    pub fn admin(id: UserId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    /// Check if the actor holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
