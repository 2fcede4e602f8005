//! Pure decision layer in front of protected operations. Each function is a
//! stateless read against the catalog: no session, no writes, no caching.
//! Every path that cannot positively establish ALLOW resolves to DENY or to
//! a store error, never to an implicit allow.

use std::sync::Arc;

use tracing::{debug, warn};

use super::principal::Principal;
use super::store::RoleStore;
use super::verdict::{Denial, Granted, Verdict};
use crate::error::StoreError;

/// Authorization resolver over an injected catalog handle. Construct once
/// at process start and share; it holds no mutable state.
pub struct Authorizer {
    store: Arc<dyn RoleStore>,
}

impl Authorizer {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// ALLOW if the caller holds at least one currently-active role named in
    /// `allowed`. An empty `allowed` list matches nothing.
    pub async fn require_role(
        &self,
        principal: Option<&Principal>,
        allowed: &[&str],
    ) -> Result<Verdict, StoreError> {
        let Some(p) = principal else {
            return Ok(Verdict::Deny(Denial::NotAuthenticated));
        };
        let grants = self.store.active_roles_of(p.id).await?;
        if grants.is_empty() {
            return Ok(Verdict::Deny(Denial::NoRolesAssigned));
        }
        let held: Vec<String> = grants.iter().map(|g| g.name.clone()).collect();
        let hit = grants.iter().any(|g| allowed.contains(&g.name.as_str()));
        if !hit {
            warn!(
                "authz.role deny user={} required=[{}] held=[{}]",
                p.id,
                allowed.join(", "),
                held.join(", ")
            );
            return Ok(Verdict::Deny(Denial::MissingRole {
                required: allowed.iter().map(|s| s.to_string()).collect(),
                held,
            }));
        }
        let level = grants.iter().map(|g| g.level).max();
        debug!("authz.role allow user={} roles=[{}]", p.id, held.join(", "));
        Ok(Verdict::Allow(Granted { roles: held, level, ..Default::default() }))
    }

    /// ALLOW if any permission reachable through the caller's active roles
    /// is named in `allowed`. The resolved set is deduplicated, so a
    /// permission granted by several roles counts once.
    pub async fn require_permission(
        &self,
        principal: Option<&Principal>,
        allowed: &[&str],
    ) -> Result<Verdict, StoreError> {
        let Some(p) = principal else {
            return Ok(Verdict::Deny(Denial::NotAuthenticated));
        };
        let perms = self.store.active_permissions_of(p.id).await?;
        if perms.is_empty() {
            return Ok(Verdict::Deny(Denial::NoPermissionsAssigned));
        }
        let held: Vec<String> = perms.iter().cloned().collect();
        let hit = allowed.iter().any(|a| perms.contains(*a));
        if !hit {
            warn!(
                "authz.permission deny user={} required=[{}]",
                p.id,
                allowed.join(", ")
            );
            return Ok(Verdict::Deny(Denial::MissingPermission {
                required: allowed.iter().map(|s| s.to_string()).collect(),
                held,
            }));
        }
        debug!("authz.permission allow user={}", p.id);
        Ok(Verdict::Allow(Granted { permissions: held, ..Default::default() }))
    }

    /// ALLOW iff the caller's effective level (max over active grants, 0
    /// with none) is at least `minimum`.
    pub async fn require_min_level(
        &self,
        principal: Option<&Principal>,
        minimum: i32,
    ) -> Result<Verdict, StoreError> {
        let Some(p) = principal else {
            return Ok(Verdict::Deny(Denial::NotAuthenticated));
        };
        let grants = self.store.active_roles_of(p.id).await?;
        let actual = grants.iter().map(|g| g.level).max().unwrap_or(0);
        if actual < minimum {
            warn!(
                "authz.level deny user={} required={} actual={}",
                p.id, minimum, actual
            );
            return Ok(Verdict::Deny(Denial::InsufficientLevel { required: minimum, actual }));
        }
        debug!("authz.level allow user={} level={}", p.id, actual);
        Ok(Verdict::Allow(Granted { level: Some(actual), ..Default::default() }))
    }

    /// Self-access is always allowed, without touching the store. Anyone
    /// else needs the admin role; no other role bypasses ownership.
    pub async fn require_owner_or_admin(
        &self,
        principal: Option<&Principal>,
        owner_id: i64,
    ) -> Result<Verdict, StoreError> {
        let Some(p) = principal else {
            return Ok(Verdict::Deny(Denial::NotAuthenticated));
        };
        if p.id == owner_id {
            debug!("authz.owner allow user={} (self)", p.id);
            return Ok(Verdict::Allow(Granted::default()));
        }
        match self.require_role(principal, &["admin"]).await? {
            Verdict::Allow(granted) => Ok(Verdict::Allow(granted)),
            Verdict::Deny(_) => Ok(Verdict::Deny(Denial::NotOwner)),
        }
    }
}
