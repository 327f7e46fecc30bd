//! Existence checks.

use super::query_one;
use crate::db::Executor;
use crate::error::RepoResult;
use crate::query::{Filter, SqlFragment, StatementBuilder};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};

/// Checks whether a record visible to a tenant exists.
#[derive(Debug, Clone)]
pub struct ExistQuerier {
    scope: TenantScope,
}

impl ExistQuerier {
    /// Creates a querier over the scope's table.
    pub fn new(scope: TenantScope) -> Self {
        Self { scope }
    }

    /// Returns whether a row matching `filter` is visible to `tenant`.
    pub async fn exists(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
    ) -> RepoResult<bool> {
        self.exists_with_level(db, tenant, filter, AccessLevel::Read)
            .await
    }

    /// Returns whether a row matching `filter` is owned by `tenant`.
    pub async fn owner_exists(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
    ) -> RepoResult<bool> {
        self.exists_with_level(db, tenant, filter, AccessLevel::Owner)
            .await
    }

    async fn exists_with_level(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
        level: AccessLevel,
    ) -> RepoResult<bool> {
        let tenant = TenantId::require(tenant)?;
        let filter = self.scope.restrict(&tenant, filter.into(), level)?;
        let stmt = StatementBuilder::select_exists(self.scope.table(), &filter)?;
        probe(db, stmt, self.scope.resource()).await
    }
}

/// Checks whether a record exists, without tenant scoping.
#[derive(Debug, Clone)]
pub struct ExistQuerierGlobal {
    resource: ResourceType,
}

impl ExistQuerierGlobal {
    /// Creates a querier over the resource type's table.
    pub fn new(resource: ResourceType) -> Self {
        Self { resource }
    }

    /// Returns whether a row matching `filter` exists.
    pub async fn exists_global(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
    ) -> RepoResult<bool> {
        let stmt = StatementBuilder::select_exists(self.resource.table(), &filter.into())?;
        probe(db, stmt, &self.resource).await
    }
}

/// Runs a `SELECT 1` statement. Only "no rows" means `false`; every other
/// failure is returned.
pub(crate) async fn probe(
    db: &dyn Executor,
    stmt: SqlFragment,
    resource: &ResourceType,
) -> RepoResult<bool> {
    match query_one(db, &stmt.rebind(), resource.name()).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
