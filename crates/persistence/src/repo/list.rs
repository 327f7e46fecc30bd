//! Unbounded SELECT primitives.

use super::{FromRow, decode_rows, query_rows, to_columns};
use crate::db::Executor;
use crate::error::RepoResult;
use crate::query::{Filter, OrderBy, StatementBuilder};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};

/// Lists every record visible to a tenant. No implicit LIMIT is applied.
#[derive(Debug, Clone)]
pub struct Lister {
    scope: TenantScope,
    columns: Vec<String>,
}

impl Lister {
    /// Creates a lister selecting `columns` from the scope's table.
    pub fn new<I, S>(scope: TenantScope, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope,
            columns: to_columns(columns),
        }
    }

    /// Returns the records matching `filter` for `tenant`.
    pub async fn list<T: FromRow>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
    ) -> RepoResult<Vec<T>> {
        let mut out = Vec::new();
        self.list_into(db, tenant, filter, order_by, &mut out).await?;
        Ok(out)
    }

    /// Appends the records matching `filter` for `tenant` to `dest`.
    pub async fn list_into<T: FromRow>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
        dest: &mut impl Extend<T>,
    ) -> RepoResult<()> {
        let tenant = TenantId::require(tenant)?;
        let filter = self.scope.restrict(&tenant, filter.into(), AccessLevel::Read)?;
        list_into(db, self.scope.resource(), &self.columns, &filter, order_by, dest).await
    }
}

/// Lists records without tenant scoping.
#[derive(Debug, Clone)]
pub struct ListerGlobal {
    resource: ResourceType,
    columns: Vec<String>,
}

impl ListerGlobal {
    /// Creates a lister selecting `columns` from the resource type's table.
    pub fn new<I, S>(resource: ResourceType, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource,
            columns: to_columns(columns),
        }
    }

    /// Returns the records matching `filter`.
    pub async fn list_global<T: FromRow>(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
    ) -> RepoResult<Vec<T>> {
        let mut out = Vec::new();
        self.list_global_into(db, filter, order_by, &mut out).await?;
        Ok(out)
    }

    /// Appends the records matching `filter` to `dest`.
    pub async fn list_global_into<T: FromRow>(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
        dest: &mut impl Extend<T>,
    ) -> RepoResult<()> {
        list_into(db, &self.resource, &self.columns, &filter.into(), order_by, dest).await
    }
}

async fn list_into<T: FromRow>(
    db: &dyn Executor,
    resource: &ResourceType,
    columns: &[String],
    filter: &Filter,
    order_by: &[OrderBy],
    dest: &mut impl Extend<T>,
) -> RepoResult<()> {
    let stmt = StatementBuilder::select(resource.table(), columns, filter, order_by)?.rebind();
    let rows = query_rows(db, &stmt, resource.name()).await?;
    dest.extend(decode_rows::<T>(&rows)?);
    Ok(())
}
