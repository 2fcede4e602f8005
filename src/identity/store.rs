use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// One active role grant as the resolver sees it: role name plus privilege
/// level (higher = more trusted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleGrant {
    pub name: String,
    pub level: i32,
}

/// Read seam between the resolver and whatever holds the RBAC catalogs.
///
/// Both queries must reflect only active assignments of active roles;
/// soft-deleted rows stay invisible here even though they remain in the
/// store for audit history.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Active roles of a user, one entry per active assignment.
    async fn active_roles_of(&self, user_id: i64) -> Result<Vec<RoleGrant>, StoreError>;

    /// Permission names reachable through any active assignment, resolved
    /// through role -> role/permission link -> permission and deduplicated.
    async fn active_permissions_of(&self, user_id: i64) -> Result<BTreeSet<String>, StoreError>;
}
