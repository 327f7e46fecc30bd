//! Tenant isolation predicates.
//!
//! Every tenant-scoped statement starts its `WHERE` clause with the predicate
//! built here, so all other conditions only ever see rows the caller's tenant
//! is allowed to see.

use serde::{Deserialize, Serialize};

use super::{ResourceType, TenantId};
use crate::config::RepoConfig;
use crate::error::RepoResult;
use crate::query::{Condition, SqlValue, validate_identifier};

/// Which way a hierarchy predicate walks from the caller's tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyDirection {
    /// The tenant and all of its ancestors.
    Ancestors,
    /// The tenant and all of its descendants.
    #[default]
    Descendants,
}

/// What the caller intends to do with the rows it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Read-only visibility.
    Read,
    /// Mutation or deletion; requires ownership.
    Owner,
}

/// How a repository scopes rows to a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tenancy {
    /// Visibility is recorded in the resource type's tenant-access table,
    /// which the propagator replicates up the tenant hierarchy:
    /// `id IN (SELECT id FROM <access> WHERE tenant_id = ?[ AND owner = true])`.
    AccessTable,

    /// The row carries its owning tenant: `column = ?`.
    Embedded {
        /// Tenant column of the resource table.
        column: String,
    },

    /// The row carries its owning tenant and visibility follows the tenant
    /// hierarchy: `column IN (WITH RECURSIVE ...)`. Mutations are restricted to
    /// rows owned by the caller's own tenant.
    Hierarchy {
        /// Tenant column of the resource table.
        column: String,
        /// Which related tenants are visible.
        direction: HierarchyDirection,
    },
}

impl Tenancy {
    /// Embedded tenancy on `column`.
    pub fn embedded(column: impl Into<String>) -> Self {
        Tenancy::Embedded {
            column: column.into(),
        }
    }

    /// Hierarchical tenancy on `column`.
    pub fn hierarchy(column: impl Into<String>, direction: HierarchyDirection) -> Self {
        Tenancy::Hierarchy {
            column: column.into(),
            direction,
        }
    }

    /// Builds the isolation predicate for `tenant` over rows of `resource`.
    pub fn predicate(
        &self,
        config: &RepoConfig,
        resource: &ResourceType,
        tenant: &TenantId,
        level: AccessLevel,
    ) -> RepoResult<Condition> {
        match self {
            Tenancy::AccessTable => {
                let access_table = resource.require_access_table()?;
                access_table_condition(config, access_table, tenant, level == AccessLevel::Owner)
            }
            Tenancy::Embedded { column } => Ok(Condition::equal(column.as_str(), tenant)),
            Tenancy::Hierarchy { column, .. } if level == AccessLevel::Owner => {
                Ok(Condition::equal(column.as_str(), tenant))
            }
            Tenancy::Hierarchy { column, direction } => {
                let closure = match direction {
                    HierarchyDirection::Ancestors => {
                        format!(
                            "{} SELECT {} FROM parents",
                            ancestors_cte(config)?,
                            config.tenant_id_column
                        )
                    }
                    HierarchyDirection::Descendants => {
                        format!(
                            "{} SELECT {} FROM children",
                            descendants_cte(config)?,
                            config.tenant_id_column
                        )
                    }
                };
                Ok(Condition::in_subquery(
                    column.as_str(),
                    closure,
                    vec![SqlValue::from(tenant)],
                ))
            }
        }
    }
}

/// `id IN (SELECT id FROM <access_table> WHERE tenant_id = ?[ AND owner = true])`
pub fn access_table_condition(
    config: &RepoConfig,
    access_table: &str,
    tenant: &TenantId,
    owner_only: bool,
) -> RepoResult<Condition> {
    validate_identifier(access_table)?;
    let mut subquery = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        config.access_resource_column, access_table, config.access_tenant_column
    );
    if owner_only {
        subquery.push_str(&format!(" AND {} = true", config.access_owner_column));
    }
    Ok(Condition::in_subquery(
        "id",
        subquery,
        vec![SqlValue::from(tenant)],
    ))
}

/// The recursive CTE named `parents`: the seed tenant (bound to the single
/// `?`) and every ancestor, with columns `id, parent`.
pub(crate) fn ancestors_cte(config: &RepoConfig) -> RepoResult<String> {
    config.validate()?;
    let RepoConfig {
        tenant_table: table,
        tenant_id_column: id,
        tenant_parent_column: parent,
        ..
    } = config;
    Ok(format!(
        "WITH RECURSIVE parents AS (SELECT t1.{id}, t1.{parent} FROM {table} t1 WHERE {id} = ? \
         UNION ALL SELECT t2.{id}, t2.{parent} FROM {table} t2 INNER JOIN parents t ON t2.{id} = t.{parent})"
    ))
}

/// The recursive CTE named `children`: the seed tenant (bound to the single
/// `?`) and every descendant, with column `id`.
pub(crate) fn descendants_cte(config: &RepoConfig) -> RepoResult<String> {
    config.validate()?;
    let RepoConfig {
        tenant_table: table,
        tenant_id_column: id,
        tenant_parent_column: parent,
        ..
    } = config;
    Ok(format!(
        "WITH RECURSIVE children AS (SELECT t1.{id} FROM {table} t1 WHERE {id} = ? \
         UNION ALL SELECT t2.{id} FROM {table} t2 INNER JOIN children t ON t2.{parent} = t.{id})"
    ))
}
