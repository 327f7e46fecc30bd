//! Single-row SELECT primitives.

use super::{FromRow, query_one, to_columns};
use crate::db::Executor;
use crate::error::RepoResult;
use crate::query::{Filter, OrderBy, SqlFragment, StatementBuilder};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};

/// Fetches one record visible to a tenant.
///
/// Zero matching rows is [`RepoError::NotFound`](crate::RepoError::NotFound).
/// When several rows match, the first one in `order_by` order is returned;
/// callers are responsible for conditions that select a single row.
#[derive(Debug, Clone)]
pub struct SingleGetter {
    scope: TenantScope,
    columns: Vec<String>,
}

impl SingleGetter {
    /// Creates a getter selecting `columns` from the scope's table.
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

    /// Fetches the record matching `filter` for `tenant`.
    pub async fn get<T: FromRow>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
    ) -> RepoResult<T> {
        let stmt = self.build(tenant, filter.into(), order_by, AccessLevel::Read)?;
        fetch(db, stmt, self.scope.resource()).await
    }

    /// Fetches and row-locks the record matching `filter`, requiring that
    /// `tenant` owns it.
    pub async fn get_for_update<T: FromRow>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
    ) -> RepoResult<T> {
        let mut stmt = self.build(tenant, filter.into(), order_by, AccessLevel::Owner)?;
        stmt.push_sql(" FOR UPDATE");
        fetch(db, stmt, self.scope.resource()).await
    }

    fn build(
        &self,
        tenant: &str,
        filter: Filter,
        order_by: &[OrderBy],
        level: AccessLevel,
    ) -> RepoResult<SqlFragment> {
        let tenant = TenantId::require(tenant)?;
        let filter = self.scope.restrict(&tenant, filter, level)?;
        StatementBuilder::select(self.scope.table(), &self.columns, &filter, order_by)
    }
}

/// Fetches one record without tenant scoping.
#[derive(Debug, Clone)]
pub struct SingleGetterGlobal {
    resource: ResourceType,
    columns: Vec<String>,
}

impl SingleGetterGlobal {
    /// Creates a getter selecting `columns` from the resource type's table.
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

    /// Fetches the record matching `filter`.
    pub async fn get_global<T: FromRow>(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
    ) -> RepoResult<T> {
        let stmt =
            StatementBuilder::select(self.resource.table(), &self.columns, &filter.into(), order_by)?;
        fetch(db, stmt, &self.resource).await
    }

    /// Fetches and row-locks the record matching `filter`.
    pub async fn get_for_update_global<T: FromRow>(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
    ) -> RepoResult<T> {
        let mut stmt =
            StatementBuilder::select(self.resource.table(), &self.columns, &filter.into(), order_by)?;
        stmt.push_sql(" FOR UPDATE");
        fetch(db, stmt, &self.resource).await
    }
}

async fn fetch<T: FromRow>(
    db: &dyn Executor,
    stmt: SqlFragment,
    resource: &ResourceType,
) -> RepoResult<T> {
    let row = query_one(db, &stmt.rebind(), resource.name()).await?;
    T::from_row(&row)
}
