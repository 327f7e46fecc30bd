//! DELETE primitives.

use super::execute;
use crate::db::Executor;
use crate::error::{RepoError, RepoResult};
use crate::query::{Filter, StatementBuilder};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};

/// Deletes records owned by a tenant.
///
/// [`delete_one`](Deleter::delete_one) must remove exactly one row: zero is
/// [`RepoError::Unauthorized`] (the row does not exist or the tenant does not
/// own it), more than one is an internal error.
/// [`delete_many`](Deleter::delete_many) accepts any number of rows.
#[derive(Debug, Clone)]
pub struct Deleter {
    scope: TenantScope,
}

impl Deleter {
    /// Creates a deleter over the scope's table.
    pub fn new(scope: TenantScope) -> Self {
        Self { scope }
    }

    /// Deletes the single row matching `filter` owned by `tenant`.
    pub async fn delete_one(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
    ) -> RepoResult<()> {
        let affected = self.delete(db, tenant, filter.into()).await?;
        let resource = self.scope.resource();
        match affected {
            1 => Ok(()),
            0 => {
                tracing::warn!(
                    "Delete of {} matched no rows owned by tenant {}",
                    resource.name(),
                    tenant
                );
                Err(RepoError::unauthorized(format!(
                    "delete of {} removed no rows",
                    resource.name()
                )))
            }
            n => Err(unexpected_count(resource, n)),
        }
    }

    /// Deletes every row matching `filter` owned by `tenant`. Returns the
    /// number of rows removed.
    pub async fn delete_many(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
    ) -> RepoResult<u64> {
        self.delete(db, tenant, filter.into()).await
    }

    async fn delete(&self, db: &dyn Executor, tenant: &str, filter: Filter) -> RepoResult<u64> {
        let tenant = TenantId::require(tenant)?;
        let filter = self.scope.restrict(&tenant, filter, AccessLevel::Owner)?;
        run_delete(db, self.scope.resource(), &filter).await
    }
}

/// Deletes records without tenant scoping.
#[derive(Debug, Clone)]
pub struct DeleterGlobal {
    resource: ResourceType,
}

impl DeleterGlobal {
    /// Creates a deleter over the resource type's table.
    pub fn new(resource: ResourceType) -> Self {
        Self { resource }
    }

    /// Deletes the single row matching `filter`. Anything other than exactly
    /// one removed row is an internal error.
    pub async fn delete_one_global(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
    ) -> RepoResult<()> {
        let affected = run_delete(db, &self.resource, &filter.into()).await?;
        if affected != 1 {
            return Err(unexpected_count(&self.resource, affected));
        }
        Ok(())
    }

    /// Deletes every row matching `filter`. Returns the number of rows removed.
    pub async fn delete_many_global(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
    ) -> RepoResult<u64> {
        run_delete(db, &self.resource, &filter.into()).await
    }
}

async fn run_delete(db: &dyn Executor, resource: &ResourceType, filter: &Filter) -> RepoResult<u64> {
    let stmt = StatementBuilder::delete(resource.table(), filter)?.rebind();
    execute(db, &stmt, resource.name())
        .await
        .map_err(|e| e.context(format!("while deleting from {}", resource.name())))
}

fn unexpected_count(resource: &ResourceType, affected: u64) -> RepoError {
    tracing::warn!("Delete of {} removed {} rows", resource.name(), affected);
    RepoError::internal(format!(
        "delete should remove single row, but removed {} rows",
        affected
    ))
}
