//! Tenant-access rows and their recursive propagation.
//!
//! A tenant-access table holds `(tenant_id, id, owner)` rows granting a tenant
//! visibility of a resource, and ownership when `owner` is set. When a tenant
//! creates a top-level resource, a single recursive statement writes one row
//! for the tenant and for each of its ancestors, so every ancestor can see
//! the resource with a direct lookup.

use serde::{Deserialize, Serialize};

use super::TenantId;
use super::tenancy::ancestors_cte;
use crate::config::RepoConfig;
use crate::db::Executor;
use crate::error::RepoResult;
use crate::query::{Condition, Filter, Row, SqlFragment, SqlValue, StatementBuilder, validate_identifier};
use crate::repo::{FromRow, execute, query_one};

const RESOURCE: &str = "tenant access";

/// One row of a tenant-access table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantAccess {
    /// The tenant granted access.
    pub tenant_id: String,
    /// The resource the grant is for.
    pub resource_id: String,
    /// Whether the tenant may mutate the resource.
    pub owner: bool,
}

impl TenantAccess {
    /// Creates an access grant.
    pub fn new(tenant_id: impl Into<String>, resource_id: impl Into<String>, owner: bool) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_id: resource_id.into(),
            owner,
        }
    }
}

impl FromRow for TenantAccess {
    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(Self {
            tenant_id: row.get_at(0)?,
            resource_id: row.get_at(1)?,
            owner: row.get_at(2)?,
        })
    }
}

/// Inserts `access` for its tenant and every ancestor tenant.
///
/// A duplicate grant anywhere in the chain fails the whole statement with
/// [`RepoError::NotUnique`](crate::RepoError::NotUnique).
pub async fn create_tenant_access_recursively(
    db: &dyn Executor,
    config: &RepoConfig,
    access_table: &str,
    access: &TenantAccess,
) -> RepoResult<()> {
    let fragment = recursive_insert(config, access_table, access, false)?;
    execute(db, &fragment.rebind(), RESOURCE).await?;
    Ok(())
}

/// Like [`create_tenant_access_recursively`], but grants that already exist
/// are left untouched, so repeating the call is harmless.
pub async fn upsert_tenant_access_recursively(
    db: &dyn Executor,
    config: &RepoConfig,
    access_table: &str,
    access: &TenantAccess,
) -> RepoResult<()> {
    let fragment = recursive_insert(config, access_table, access, true)?;
    execute(db, &fragment.rebind(), RESOURCE).await?;
    Ok(())
}

/// Revokes owner grants on `resource_ids` from `tenant` and all of its ancestors.
///
/// An empty `resource_ids` is a no-op.
pub async fn delete_tenant_access_recursively(
    db: &dyn Executor,
    config: &RepoConfig,
    access_table: &str,
    tenant: &str,
    resource_ids: &[String],
) -> RepoResult<()> {
    let tenant = TenantId::require(tenant)?;
    if resource_ids.is_empty() {
        return Ok(());
    }
    validate_identifier(access_table)?;

    let [tenant_col, resource_col, owner_col] = config.access_columns();
    let mut fragment = SqlFragment::with_args(
        format!(
            "{} DELETE FROM {} WHERE {} IN (SELECT {} FROM parents) AND {} = true AND ",
            ancestors_cte(config)?,
            access_table,
            tenant_col,
            config.tenant_id_column,
            owner_col
        ),
        vec![SqlValue::from(&tenant)],
    );
    fragment.append(
        "",
        Condition::in_values(resource_col, resource_ids.iter()).render(),
    );
    execute(db, &fragment.rebind(), RESOURCE).await?;
    Ok(())
}

/// Fetches the grant of `tenant` on `resource_id`.
///
/// Fails with [`RepoError::NotFound`](crate::RepoError::NotFound) when there is none.
pub async fn get_tenant_access(
    db: &dyn Executor,
    config: &RepoConfig,
    access_table: &str,
    tenant: &str,
    resource_id: &str,
) -> RepoResult<TenantAccess> {
    let tenant = TenantId::require(tenant)?;
    let [tenant_col, resource_col, _] = config.access_columns();
    let filter = Filter::from(vec![
        Condition::equal(tenant_col, &tenant),
        Condition::equal(resource_col, resource_id),
    ]);
    let stmt =
        StatementBuilder::select(access_table, &config.access_columns(), &filter, &[])?.rebind();
    let row = query_one(db, &stmt, RESOURCE).await?;
    TenantAccess::from_row(&row)
}

/// Deletes the grants of `tenant` on `resource_ids`, without touching other
/// tenants in the hierarchy. Returns the number of grants removed.
pub async fn delete_tenant_access(
    db: &dyn Executor,
    config: &RepoConfig,
    access_table: &str,
    tenant: &str,
    resource_ids: &[String],
) -> RepoResult<u64> {
    let tenant = TenantId::require(tenant)?;
    if resource_ids.is_empty() {
        return Ok(0);
    }
    let [tenant_col, resource_col, _] = config.access_columns();
    let filter = Filter::from(vec![
        Condition::equal(tenant_col, &tenant),
        Condition::in_values(resource_col, resource_ids.iter()),
    ]);
    let stmt = StatementBuilder::delete(access_table, &filter)?.rebind();
    execute(db, &stmt, RESOURCE).await
}

fn recursive_insert(
    config: &RepoConfig,
    access_table: &str,
    access: &TenantAccess,
    ignore_existing: bool,
) -> RepoResult<SqlFragment> {
    let tenant = TenantId::require(&access.tenant_id)?;
    validate_identifier(access_table)?;

    let [tenant_col, resource_col, owner_col] = config.access_columns();
    let mut sql = format!(
        "{} INSERT INTO {} ( {}, {}, {} ) (SELECT parents.{} AS {}, ? AS {}, ? AS {} FROM parents)",
        ancestors_cte(config)?,
        access_table,
        tenant_col,
        resource_col,
        owner_col,
        config.tenant_id_column,
        tenant_col,
        resource_col,
        owner_col
    );
    if ignore_existing {
        sql.push_str(&format!(
            " ON CONFLICT ( {}, {} ) DO NOTHING",
            tenant_col, resource_col
        ));
    }
    Ok(SqlFragment::with_args(
        sql,
        vec![
            SqlValue::from(&tenant),
            SqlValue::text(access.resource_id.as_str()),
            SqlValue::Bool(access.owner),
        ],
    ))
}
