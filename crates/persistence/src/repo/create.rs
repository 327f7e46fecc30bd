//! INSERT primitives.

use super::exist::probe;
use super::{Entity, entity_values, execute, to_columns};
use crate::db::Executor;
use crate::error::{RepoError, RepoResult};
use crate::query::{Condition, Filter, SqlValue, StatementBuilder};
use crate::tenant::{
    ParentRef, ResourceType, Tenancy, TenantAccess, TenantId, TenantScope,
    access_table_condition, create_tenant_access_recursively,
};

/// Inserts tenant-owned records.
///
/// In [`Tenancy::AccessTable`] mode a top-level record gets owner grants for
/// the caller's tenant and all of its ancestors; a child record may only be
/// created under a parent the caller owns. In embedded and hierarchy modes
/// the record's tenant column must name the caller's tenant.
#[derive(Debug, Clone)]
pub struct Creator {
    scope: TenantScope,
    columns: Vec<String>,
}

impl Creator {
    /// Creates a creator inserting `columns` into the scope's table.
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

    /// Inserts `entity` on behalf of `tenant`.
    pub async fn create<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        entity: &E,
    ) -> RepoResult<()> {
        let tenant = TenantId::require(tenant)?;
        let resource = self.scope.resource();

        authorize_insert(db, &self.scope, &tenant, entity).await?;
        insert(db, resource, &self.columns, entity).await?;

        if matches!(self.scope.tenancy(), Tenancy::AccessTable) && resource.is_top_level() {
            let access_table = resource.require_access_table()?;
            let access = TenantAccess::new(tenant.as_str(), entity.id(), true);
            create_tenant_access_recursively(db, self.scope.config(), access_table, &access)
                .await
                .map_err(|e| {
                    e.context(format!(
                        "while creating tenant access for {} with id {}",
                        resource.name(),
                        entity.id()
                    ))
                })?;
        }
        Ok(())
    }
}

/// Inserts records without any tenant handling.
#[derive(Debug, Clone)]
pub struct CreatorGlobal {
    resource: ResourceType,
    columns: Vec<String>,
}

impl CreatorGlobal {
    /// Creates a creator inserting `columns` into the resource type's table.
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

    /// Inserts `entity`.
    pub async fn create<E: Entity + ?Sized>(&self, db: &dyn Executor, entity: &E) -> RepoResult<()> {
        insert(db, &self.resource, &self.columns, entity).await
    }
}

async fn insert<E: Entity + ?Sized>(
    db: &dyn Executor,
    resource: &ResourceType,
    columns: &[String],
    entity: &E,
) -> RepoResult<()> {
    let values = entity_values(entity, columns, resource.name())?;
    let stmt = StatementBuilder::insert(resource.table(), columns, values)?.rebind();
    execute(db, &stmt, resource.name()).await.map_err(|e| {
        e.context(format!(
            "while inserting {} with id {}",
            resource.name(),
            entity.id()
        ))
    })?;
    Ok(())
}

/// Checks that `tenant` may write `entity` as a new row: a child in
/// access-table mode needs an owned parent, and in embedded and hierarchy
/// modes the entity's tenant column must name `tenant`.
pub(crate) async fn authorize_insert<E: Entity + ?Sized>(
    db: &dyn Executor,
    scope: &TenantScope,
    tenant: &TenantId,
    entity: &E,
) -> RepoResult<()> {
    let resource = scope.resource();
    match scope.tenancy() {
        Tenancy::AccessTable if !resource.is_top_level() => {
            let parent = entity.parent().ok_or_else(|| {
                RepoError::internal(format!(
                    "{} with id {} has no parent",
                    resource.name(),
                    entity.id()
                ))
            })?;
            check_parent_owner(db, scope, tenant, &parent).await
        }
        Tenancy::AccessTable => Ok(()),
        Tenancy::Embedded { column } | Tenancy::Hierarchy { column, .. } => {
            if entity.value(column) == Some(SqlValue::from(tenant)) {
                return Ok(());
            }
            Err(RepoError::unauthorized(format!(
                "{} with id {} does not belong to the caller tenant",
                resource.name(),
                entity.id()
            )))
        }
    }
}

async fn check_parent_owner(
    db: &dyn Executor,
    scope: &TenantScope,
    tenant: &TenantId,
    parent: &ParentRef,
) -> RepoResult<()> {
    let parent_type = &parent.resource_type;
    let access_table = parent_type.require_access_table()?;
    let filter = Filter::from(vec![
        access_table_condition(scope.config(), access_table, tenant, true)?,
        Condition::equal("id", parent.id.as_str()),
    ]);
    let stmt = StatementBuilder::select_exists(parent_type.table(), &filter)?;

    if probe(db, stmt, parent_type).await? {
        return Ok(());
    }
    Err(RepoError::unauthorized(format!(
        "tenant {} does not own {} with id {}",
        tenant,
        parent_type.name(),
        parent.id
    )))
}
