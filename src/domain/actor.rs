use crate::domain::UserId;
use crate::error::{ForbiddenReason, Result};
use serde::{Deserialize, Serialize};

/// Caller role as resolved by the outer auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Admin,
}

/// Resolved caller identity. The ledger does not authenticate; it trusts the
/// user id and role handed to it and only enforces ownership and role gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user: UserId,
    pub role: Role,
}

impl Actor {
    pub const fn client(user: UserId) -> Self {
        Self {
            user,
            role: Role::Client,
        }
    }

    pub const fn admin(user: UserId) -> Self {
        Self {
            user,
            role: Role::Admin,
        }
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ForbiddenReason::AdminRequired.into())
        }
    }

    /// Admins pass; clients must be the owner.
    pub fn require_owner(&self, owner: UserId, entity: &'static str, id: u32) -> Result<()> {
        if self.role == Role::Admin || self.user == owner {
            Ok(())
        } else {
            Err(ForbiddenReason::NotOwner {
                user: self.user,
                entity,
                id,
            }
            .into())
        }
    }
}
