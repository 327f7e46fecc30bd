//! Tenant isolation.
//!
//! Tenants form a hierarchy (each tenant row may point at a parent). A tenant
//! may see rows it owns and rows made visible to it through the hierarchy,
//! and may only mutate rows it owns.
//!
//! # Core Types
//!
//! - [`TenantId`] - non-empty tenant identifier
//! - [`ResourceType`] - table and tenant-access table of a kind of record
//! - [`Tenancy`] - how a resource table is scoped (access table, embedded column, hierarchy)
//! - [`TenantScope`] - resource type + tenancy + configuration, given to each repository
//! - [`TenantAccess`] - one visibility/ownership grant
//!
//! # Tenant-access propagation
//!
//! Grants for top-level resources are written for the creating tenant and all
//! of its ancestors in one recursive statement:
//!
//! ```sql
//! WITH RECURSIVE parents AS (
//!     SELECT t1.id, t1.parent FROM business_tenant_mappings t1 WHERE id = $1
//!     UNION ALL
//!     SELECT t2.id, t2.parent FROM business_tenant_mappings t2
//!     INNER JOIN parents t ON t2.id = t.parent)
//! INSERT INTO tenant_applications ( tenant_id, id, owner )
//!     (SELECT parents.id AS tenant_id, $2 AS id, $3 AS owner FROM parents)
//! ON CONFLICT ( tenant_id, id ) DO NOTHING
//! ```

mod access;
mod id;
mod resource;
mod scope;
mod tenancy;

pub use access::{
    TenantAccess, create_tenant_access_recursively, delete_tenant_access,
    delete_tenant_access_recursively, get_tenant_access, upsert_tenant_access_recursively,
};
pub use id::TenantId;
pub use resource::{ParentRef, ResourceType};
pub use scope::TenantScope;
pub use tenancy::{AccessLevel, HierarchyDirection, Tenancy, access_table_condition};
