//! Identity and authorization core: the principal handed down by the
//! authentication layer, the role/permission catalog seam, and the decision
//! functions guarding protected operations.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod catalog;
#[cfg(feature = "postgres")]
mod postgres;
mod principal;
mod store;
mod verdict;

pub use authorizer::Authorizer;
pub use catalog::{CatalogStats, MemoryCatalog, NewPermission, NewRole, PermissionRow, RoleRow};
#[cfg(feature = "postgres")]
pub use postgres::PgCatalog;
pub use principal::{Attrs, Principal};
pub use store::{RoleGrant, RoleStore};
pub use verdict::{Denial, Granted, Verdict};
