//! In-memory role/permission catalog: the [`RoleStore`] reads the resolver
//! needs plus the administrative mutations (create/grant/revoke/attach).
//! Revocation is a flag flip, never a row delete, so an assignment can be
//! re-activated later and the audit trail survives.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::{RoleGrant, RoleStore};
use crate::error::{AppError, AppResult, StoreError};

/// Validated input for role creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    pub level: i32,
}

/// Validated input for permission creation. `resource` is the category
/// ("usuarios", "pagos", ...) and `action` the verb ("crear", "leer", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
}

/// Active role as listed for administrators, with its current member count.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: i32,
    pub members: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PermissionRow {
    pub name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub roles: usize,
    pub permissions: usize,
    pub assignments: usize,
    pub users_with_roles: usize,
}

#[derive(Debug)]
struct RoleRec {
    id: i64,
    name: String,
    description: String,
    level: i32,
    active: bool,
}

#[derive(Debug)]
struct PermRec {
    id: i64,
    name: String,
    description: String,
    resource: String,
    action: String,
}

#[derive(Debug)]
struct AssignmentRec {
    user_id: i64,
    role_id: i64,
    active: bool,
    assigned_by: Option<i64>,
    assigned_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    roles: Vec<RoleRec>,
    permissions: Vec<PermRec>,
    assignments: Vec<AssignmentRec>,
    role_permissions: BTreeSet<(i64, i64)>,
    next_role_id: i64,
    next_permission_id: i64,
}

impl Inner {
    fn active_role_id(&self, name: &str) -> Option<i64> {
        self.roles.iter().find(|r| r.active && r.name == name).map(|r| r.id)
    }

    fn role_id(&self, name: &str) -> Option<i64> {
        self.roles.iter().find(|r| r.name == name).map(|r| r.id)
    }

    fn permission_id(&self, name: &str) -> Option<i64> {
        self.permissions.iter().find(|p| p.name == name).map(|p| p.id)
    }
}

/// Process-local catalog. Constructed explicitly at startup and injected
/// wherever a [`RoleStore`] is needed; there is no module-level instance.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an active role. Duplicate active names conflict; level must
    /// stay within 0..=100.
    pub fn create_role(&self, role: NewRole) -> AppResult<i64> {
        if role.name.trim().is_empty() {
            return Err(AppError::user("role_name_empty", "El nombre del rol es obligatorio"));
        }
        if !(0..=100).contains(&role.level) {
            return Err(AppError::user("role_level_range", "El nivel debe estar entre 0 y 100"));
        }
        let mut inner = self.inner.write();
        if inner.active_role_id(&role.name).is_some() {
            return Err(AppError::conflict("role_exists", "Ya existe un rol con ese nombre"));
        }
        inner.next_role_id += 1;
        let id = inner.next_role_id;
        inner.roles.push(RoleRec {
            id,
            name: role.name.clone(),
            description: role.description,
            level: role.level,
            active: true,
        });
        info!("rbac.role create name={} level={} id={}", role.name, role.level, id);
        Ok(id)
    }

    pub fn create_permission(&self, perm: NewPermission) -> AppResult<i64> {
        if perm.name.trim().is_empty() {
            return Err(AppError::user("permission_name_empty", "El nombre del permiso es obligatorio"));
        }
        if perm.resource.trim().is_empty() || perm.action.trim().is_empty() {
            return Err(AppError::user("permission_fields", "Recurso y acción son obligatorios"));
        }
        let mut inner = self.inner.write();
        if inner.permission_id(&perm.name).is_some() {
            return Err(AppError::conflict("permission_exists", "Ya existe un permiso con ese nombre"));
        }
        inner.next_permission_id += 1;
        let id = inner.next_permission_id;
        inner.permissions.push(PermRec {
            id,
            name: perm.name.clone(),
            description: perm.description,
            resource: perm.resource,
            action: perm.action,
        });
        info!("rbac.permission create name={} id={}", perm.name, id);
        Ok(id)
    }

    /// Grant a role to a user. Re-granting a revoked assignment flips it
    /// back to active and refreshes the assignment metadata; the original
    /// row is reused, not duplicated.
    pub fn grant_role(&self, user_id: i64, role_name: &str, granted_by: Option<i64>) -> AppResult<()> {
        let mut inner = self.inner.write();
        let Some(role_id) = inner.active_role_id(role_name) else {
            return Err(AppError::not_found("role_not_found", "Rol no encontrado"));
        };
        let now = Utc::now();
        if let Some(a) = inner
            .assignments
            .iter_mut()
            .find(|a| a.user_id == user_id && a.role_id == role_id)
        {
            a.active = true;
            a.assigned_by = granted_by;
            a.assigned_at = now;
        } else {
            inner.assignments.push(AssignmentRec {
                user_id,
                role_id,
                active: true,
                assigned_by: granted_by,
                assigned_at: now,
            });
        }
        info!("rbac.grant user={} role={}", user_id, role_name);
        Ok(())
    }

    /// Revoke a role from a user: soft delete. The assignment row is kept
    /// with its metadata for audit reconstruction.
    pub fn revoke_role(&self, user_id: i64, role_name: &str) -> AppResult<()> {
        let mut inner = self.inner.write();
        let Some(role_id) = inner.role_id(role_name) else {
            return Err(AppError::not_found("role_not_found", "Rol no encontrado"));
        };
        if let Some(a) = inner
            .assignments
            .iter_mut()
            .find(|a| a.user_id == user_id && a.role_id == role_id)
        {
            a.active = false;
        }
        info!("rbac.revoke user={} role={}", user_id, role_name);
        Ok(())
    }

    /// Attach a permission to an active role. Idempotent.
    pub fn attach_permission(&self, role_name: &str, permission_name: &str) -> AppResult<()> {
        let mut inner = self.inner.write();
        let Some(role_id) = inner.active_role_id(role_name) else {
            return Err(AppError::not_found("role_not_found", "Rol no encontrado"));
        };
        let Some(perm_id) = inner.permission_id(permission_name) else {
            return Err(AppError::not_found("permission_not_found", "Permiso no encontrado"));
        };
        inner.role_permissions.insert((role_id, perm_id));
        debug!("rbac.attach role={} permission={}", role_name, permission_name);
        Ok(())
    }

    /// Detach a permission from a role. Succeeds whether or not the link
    /// existed, matching DELETE semantics.
    pub fn detach_permission(&self, role_name: &str, permission_name: &str) -> AppResult<()> {
        let mut inner = self.inner.write();
        let Some(role_id) = inner.role_id(role_name) else {
            return Err(AppError::not_found("role_not_found", "Rol no encontrado"));
        };
        let Some(perm_id) = inner.permission_id(permission_name) else {
            return Err(AppError::not_found("permission_not_found", "Permiso no encontrado"));
        };
        inner.role_permissions.remove(&(role_id, perm_id));
        debug!("rbac.detach role={} permission={}", role_name, permission_name);
        Ok(())
    }

    /// Active roles with their current member counts, highest level first.
    pub fn roles(&self) -> Vec<RoleRow> {
        let inner = self.inner.read();
        let mut rows: Vec<RoleRow> = inner
            .roles
            .iter()
            .filter(|r| r.active)
            .map(|r| RoleRow {
                id: r.id,
                name: r.name.clone(),
                description: r.description.clone(),
                level: r.level,
                members: inner
                    .assignments
                    .iter()
                    .filter(|a| a.role_id == r.id && a.active)
                    .count(),
            })
            .collect();
        rows.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
        rows
    }

    /// All permissions, optionally filtered by resource, ordered by
    /// (resource, action).
    pub fn permissions(&self, resource: Option<&str>) -> Vec<PermissionRow> {
        let inner = self.inner.read();
        let mut rows: Vec<PermissionRow> = inner
            .permissions
            .iter()
            .filter(|p| resource.map_or(true, |r| p.resource == r))
            .map(|p| PermissionRow {
                name: p.name.clone(),
                description: p.description.clone(),
                resource: p.resource.clone(),
                action: p.action.clone(),
            })
            .collect();
        rows.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
        rows
    }

    /// Permissions attached to one active role, ordered by (resource, action).
    pub fn permissions_of_role(&self, role_name: &str) -> AppResult<Vec<PermissionRow>> {
        let inner = self.inner.read();
        let Some(role_id) = inner.active_role_id(role_name) else {
            return Err(AppError::not_found("role_not_found", "Rol no encontrado"));
        };
        let mut rows: Vec<PermissionRow> = inner
            .permissions
            .iter()
            .filter(|p| inner.role_permissions.contains(&(role_id, p.id)))
            .map(|p| PermissionRow {
                name: p.name.clone(),
                description: p.description.clone(),
                resource: p.resource.clone(),
                action: p.action.clone(),
            })
            .collect();
        rows.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
        Ok(rows)
    }

    /// Counts over the live catalog; only active rows contribute.
    pub fn stats(&self) -> CatalogStats {
        let inner = self.inner.read();
        let active: Vec<&AssignmentRec> = inner.assignments.iter().filter(|a| a.active).collect();
        let users: BTreeSet<i64> = active.iter().map(|a| a.user_id).collect();
        CatalogStats {
            roles: inner.roles.iter().filter(|r| r.active).count(),
            permissions: inner.permissions.len(),
            assignments: active.len(),
            users_with_roles: users.len(),
        }
    }
}

#[async_trait]
impl RoleStore for MemoryCatalog {
    async fn active_roles_of(&self, user_id: i64) -> Result<Vec<RoleGrant>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id && a.active)
            .filter_map(|a| inner.roles.iter().find(|r| r.id == a.role_id && r.active))
            .map(|r| RoleGrant { name: r.name.clone(), level: r.level })
            .collect())
    }

    async fn active_permissions_of(&self, user_id: i64) -> Result<BTreeSet<String>, StoreError> {
        let inner = self.inner.read();
        let mut out = BTreeSet::new();
        for a in inner.assignments.iter().filter(|a| a.user_id == user_id && a.active) {
            let Some(role) = inner.roles.iter().find(|r| r.id == a.role_id && r.active) else {
                continue;
            };
            for p in inner.permissions.iter() {
                if inner.role_permissions.contains(&(role.id, p.id)) {
                    out.insert(p.name.clone());
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, level: i32) -> NewRole {
        NewRole { name: name.into(), description: format!("rol {}", name), level }
    }

    fn perm(name: &str, resource: &str, action: &str) -> NewPermission {
        NewPermission {
            name: name.into(),
            description: String::new(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    #[test]
    fn duplicate_role_name_conflicts() {
        let cat = MemoryCatalog::new();
        cat.create_role(role("admin", 100)).unwrap();
        let err = cat.create_role(role("admin", 90)).unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn role_inputs_are_validated() {
        let cat = MemoryCatalog::new();
        assert_eq!(cat.create_role(role("  ", 10)).unwrap_err().http_status(), 400);
        assert_eq!(cat.create_role(role("x", 101)).unwrap_err().http_status(), 400);
        assert_eq!(cat.create_role(role("x", -1)).unwrap_err().http_status(), 400);
        assert_eq!(
            cat.create_permission(perm("p", "", "crear")).unwrap_err().http_status(),
            400
        );
    }

    #[test]
    fn grant_to_unknown_role_is_not_found() {
        let cat = MemoryCatalog::new();
        let err = cat.grant_role(1, "fantasma", None).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn regrant_reactivates_the_same_assignment() {
        let cat = MemoryCatalog::new();
        cat.create_role(role("entrenador", 20)).unwrap();
        cat.grant_role(9, "entrenador", Some(1)).unwrap();
        cat.revoke_role(9, "entrenador").unwrap();
        assert_eq!(cat.stats().assignments, 0);

        cat.grant_role(9, "entrenador", Some(2)).unwrap();
        let stats = cat.stats();
        assert_eq!(stats.assignments, 1);
        assert_eq!(stats.users_with_roles, 1);
        // One reused row, not a second one
        assert_eq!(cat.inner.read().assignments.len(), 1);
        assert_eq!(cat.inner.read().assignments[0].assigned_by, Some(2));
    }

    #[test]
    fn attach_is_idempotent_and_listing_is_ordered() {
        let cat = MemoryCatalog::new();
        cat.create_role(role("entrenador", 20)).unwrap();
        cat.create_permission(perm("sesiones.crear", "sesiones", "crear")).unwrap();
        cat.create_permission(perm("clientes.leer", "clientes", "leer")).unwrap();
        cat.attach_permission("entrenador", "sesiones.crear").unwrap();
        cat.attach_permission("entrenador", "sesiones.crear").unwrap();
        cat.attach_permission("entrenador", "clientes.leer").unwrap();

        let rows = cat.permissions_of_role("entrenador").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "clientes.leer");
        assert_eq!(rows[1].name, "sesiones.crear");
    }

    #[test]
    fn roles_listing_orders_by_level_and_counts_members() {
        let cat = MemoryCatalog::new();
        cat.create_role(role("admin", 100)).unwrap();
        cat.create_role(role("entrenador", 20)).unwrap();
        cat.grant_role(1, "entrenador", None).unwrap();
        cat.grant_role(2, "entrenador", None).unwrap();

        let rows = cat.roles();
        assert_eq!(rows[0].name, "admin");
        assert_eq!(rows[0].members, 0);
        assert_eq!(rows[1].name, "entrenador");
        assert_eq!(rows[1].members, 2);
    }
}
