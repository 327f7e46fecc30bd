//! Multi-Tenant Relational Persistence Core
//!
//! This crate provides the data-access building blocks for services that
//! keep many tenants' records in one PostgreSQL database. Domain
//! repositories are assembled from generic primitives that build SQL
//! dynamically, bind every value as a positional argument and add the
//! tenant isolation predicate to every tenant-scoped statement.
//!
//! # Features
//!
//! - **Dynamic SQL**: composable [`Condition`](query::Condition)s and
//!   condition trees, `?` placeholders rebound to `$N` exactly once
//! - **Tenant isolation**: access-table, embedded-column and hierarchy
//!   tenancy, with recursive propagation of access grants to ancestor tenants
//! - **CRUD primitives**: create, get, list, update (optionally versioned),
//!   delete, exists and upsert, each with a tenant-scoped and a global variant
//! - **Paging**: opaque offset cursors, single-parent pages with totals and
//!   union pages across many parents in one round trip
//! - **Error mapping**: driver errors translated into one domain error
//!   taxonomy
//!
//! # Backend Features
//!
//! - `postgres` (default) - [`Executor`] implementation on tokio-postgres
//!   with deadpool-postgres connection pooling
//!
//! # Architecture
//!
//! - [`query`] - Values, conditions, ordering and the statement builder
//! - [`tenant`] - Tenant ids, tenancy modes and tenant-access propagation
//! - [`repo`] - The CRUD, paging and upsert primitives
//! - [`types`] - Cursors and page metadata
//! - [`db`] - The database handle abstraction
//! - [`error`] - The error taxonomy and driver error mapping
//! - [`config`] - Tenant table and column names
//! - `backends` - Driver integrations
//!
//! # Quick Start
//!
//! ```no_run
//! use tenant_persistence::query::{Condition, OrderBy, Row};
//! use tenant_persistence::repo::{FromRow, Lister};
//! use tenant_persistence::tenant::{ResourceType, Tenancy, TenantScope};
//! use tenant_persistence::{Executor, RepoResult};
//!
//! struct User {
//!     id: String,
//!     first_name: String,
//! }
//!
//! impl FromRow for User {
//!     fn from_row(row: &Row) -> RepoResult<Self> {
//!         Ok(Self {
//!             id: row.get("id")?,
//!             first_name: row.get("first_name")?,
//!         })
//!     }
//! }
//!
//! # async fn example(db: &dyn Executor) -> RepoResult<()> {
//! let scope = TenantScope::new(ResourceType::new("user", "users"))
//!     .with_tenancy(Tenancy::embedded("tenant_id"));
//! let lister = Lister::new(scope, ["id", "first_name"]);
//!
//! // SELECT id, first_name FROM users WHERE tenant_id = $1 AND age != $2 ORDER BY id ASC
//! let users: Vec<User> = lister
//!     .list(db, "T1", vec![Condition::not_equal("age", 18)], &[OrderBy::asc("id")])
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

#[cfg(feature = "postgres")]
pub mod backends;
pub mod config;
pub mod db;
pub mod error;
pub mod query;
pub mod repo;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use config::RepoConfig;
pub use db::{DriverError, DriverErrorKind, Executor};
pub use error::{ErrorKind, RepoError, RepoResult, map_driver_error};
pub use tenant::{TenantId, TenantScope};
pub use types::{Page, PageInfo};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
