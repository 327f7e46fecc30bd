//! PostgreSQL backend.
//!
//! Connection pooling via deadpool-postgres and an [`Executor`](crate::Executor)
//! for tokio-postgres clients and transactions.
//!
//! # Example
//!
//! ```no_run
//! use tenant_persistence::backends::postgres::{PgExecutor, PostgresBackend};
//! use tenant_persistence::repo::ExistQuerierGlobal;
//! use tenant_persistence::query::Condition;
//! use tenant_persistence::tenant::ResourceType;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = PostgresBackend::from_env().await?;
//! let client = backend.get_client().await?;
//! let db = PgExecutor::new(&**client);
//!
//! let tenants = ExistQuerierGlobal::new(ResourceType::new("tenant", "business_tenant_mappings"));
//! let known = tenants
//!     .exists_global(&db, Condition::equal("id", "T1"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Parameters are bound to the types the server infers for their
//! placeholders: text is parsed into `uuid` columns, integers narrow to
//! `int2`/`int4`, and NULL binds to any type. Result columns of other types
//! than booleans, integers, floats, uuids, timestamps and JSON are read as
//! text.

mod backend;
mod executor;
mod lock;

pub use backend::{PostgresBackend, PostgresConfig, PostgresSslMode};
pub use executor::PgExecutor;
pub use lock::try_advisory_xact_lock;
