//! SQL-backed role/permission catalog for deployments that keep the RBAC
//! tables (usuarios_roles / roles / roles_permisos / permisos) in the
//! relational database. Read-only: administrative mutations go through the
//! database's own transactional path, not through this client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use super::store::{RoleGrant, RoleStore};
use crate::config::StoreConfig;
use crate::error::StoreError;

const ACTIVE_ROLES_SQL: &str = "\
    SELECT r.nombre, r.nivel \
    FROM usuarios_roles ur \
    INNER JOIN roles r ON ur.rol_id = r.id \
    WHERE ur.usuario_id = $1 AND ur.activo AND r.activo";

const ACTIVE_PERMISSIONS_SQL: &str = "\
    SELECT DISTINCT p.nombre \
    FROM usuarios_roles ur \
    INNER JOIN roles r ON ur.rol_id = r.id \
    INNER JOIN roles_permisos rp ON r.id = rp.rol_id \
    INNER JOIN permisos p ON rp.permiso_id = p.id \
    WHERE ur.usuario_id = $1 AND ur.activo AND r.activo";

pub struct PgCatalog {
    client: Client,
}

impl PgCatalog {
    /// Connect using the injected configuration. The connection task is
    /// spawned here; dropping the catalog tears it down.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(&cfg.conn_string(), NoTls)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("rbac.store connection closed: {}", e);
            }
        });
        info!("rbac.store connected host={} db={}", cfg.host, cfg.dbname);
        Ok(Self { client })
    }
}

#[async_trait]
impl RoleStore for PgCatalog {
    async fn active_roles_of(&self, user_id: i64) -> Result<Vec<RoleGrant>, StoreError> {
        let rows = self
            .client
            .query(ACTIVE_ROLES_SQL, &[&user_id])
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(rows
            .iter()
            .map(|row| RoleGrant { name: row.get(0), level: row.get(1) })
            .collect())
    }

    async fn active_permissions_of(&self, user_id: i64) -> Result<BTreeSet<String>, StoreError> {
        let rows = self
            .client
            .query(ACTIVE_PERMISSIONS_SQL, &[&user_id])
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }
}
