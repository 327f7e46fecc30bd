//! Single-row UPDATE primitives.

use super::exist::probe;
use super::{Entity, entity_values, execute, to_columns};
use crate::db::Executor;
use crate::error::{RepoError, RepoResult};
use crate::query::{Condition, Filter, StatementBuilder};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};

const VERSION_COLUMN: &str = "version";
const VERSION_INCREMENT: &str = "version = version+1";

/// Updates one record owned by a tenant.
///
/// The update first checks that the record is visible to the tenant
/// (invisible is [`RepoError::NotFound`]), then updates it restricted to
/// rows the tenant owns. Exactly one row must change: zero is
/// [`RepoError::Unauthorized`], more than one is an internal error.
#[derive(Debug, Clone)]
pub struct Updater {
    scope: TenantScope,
    updatable_columns: Vec<String>,
    id_columns: Vec<String>,
}

impl Updater {
    /// Creates an updater writing `updatable_columns` of the row identified
    /// by `id_columns`.
    pub fn new<I, S, J, T>(scope: TenantScope, updatable_columns: I, id_columns: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            scope,
            updatable_columns: to_columns(updatable_columns),
            id_columns: to_columns(id_columns),
        }
    }

    /// Updates `entity` on behalf of `tenant`.
    pub async fn update_single<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        entity: &E,
    ) -> RepoResult<()> {
        self.update(db, tenant, entity, false).await
    }

    /// Updates `entity` only if its stored version equals
    /// [`Entity::version`], incrementing the version.
    pub async fn update_single_with_version<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        entity: &E,
    ) -> RepoResult<()> {
        self.update(db, tenant, entity, true).await
    }

    async fn update<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        entity: &E,
        versioned: bool,
    ) -> RepoResult<()> {
        let tenant = TenantId::require(tenant)?;
        let resource = self.scope.resource();
        let id_filter = id_filter(entity, &self.id_columns, resource)?;

        let visible = self
            .scope
            .restrict(&tenant, id_filter.clone(), AccessLevel::Read)?;
        let probe_stmt = StatementBuilder::select_exists(resource.table(), &visible)?;
        if !probe(db, probe_stmt, resource).await? {
            return Err(RepoError::not_found(resource.name()));
        }

        let owned = self.scope.restrict(
            &tenant,
            versioned_filter(id_filter, entity, versioned, resource)?,
            AccessLevel::Owner,
        )?;
        let affected = run_update(db, resource, &self.updatable_columns, entity, versioned, &owned)
            .await?;

        match affected {
            1 => Ok(()),
            0 => {
                tracing::warn!(
                    "Update of {} with id {} matched no rows owned by tenant {}",
                    resource.name(),
                    entity.id(),
                    tenant
                );
                let detail = if versioned {
                    "entity has a different version or caller tenant does not have owner access"
                } else {
                    "caller tenant does not have owner access"
                };
                Err(RepoError::unauthorized(detail))
            }
            n => Err(unexpected_count(resource, entity.id(), n)),
        }
    }
}

/// Updates one record without tenant scoping. Anything other than exactly one
/// changed row is an internal error.
#[derive(Debug, Clone)]
pub struct UpdaterGlobal {
    resource: ResourceType,
    updatable_columns: Vec<String>,
    id_columns: Vec<String>,
}

impl UpdaterGlobal {
    /// Creates an updater writing `updatable_columns` of the row identified
    /// by `id_columns`.
    pub fn new<I, S, J, T>(resource: ResourceType, updatable_columns: I, id_columns: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            resource,
            updatable_columns: to_columns(updatable_columns),
            id_columns: to_columns(id_columns),
        }
    }

    /// Updates `entity`.
    pub async fn update_single_global<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        entity: &E,
    ) -> RepoResult<()> {
        self.update(db, entity, false).await
    }

    /// Updates `entity` only if its stored version equals
    /// [`Entity::version`], incrementing the version.
    pub async fn update_single_with_version_global<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        entity: &E,
    ) -> RepoResult<()> {
        self.update(db, entity, true).await
    }

    async fn update<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        entity: &E,
        versioned: bool,
    ) -> RepoResult<()> {
        let filter = versioned_filter(
            id_filter(entity, &self.id_columns, &self.resource)?,
            entity,
            versioned,
            &self.resource,
        )?;
        let affected = run_update(
            db,
            &self.resource,
            &self.updatable_columns,
            entity,
            versioned,
            &filter,
        )
        .await?;
        if affected != 1 {
            return Err(unexpected_count(&self.resource, entity.id(), affected));
        }
        Ok(())
    }
}

fn id_filter<E: Entity + ?Sized>(
    entity: &E,
    id_columns: &[String],
    resource: &ResourceType,
) -> RepoResult<Filter> {
    let values = entity_values(entity, id_columns, resource.name())?;
    Ok(Filter::All(
        id_columns
            .iter()
            .zip(values)
            .map(|(column, value)| Condition::equal(column.as_str(), value))
            .collect(),
    ))
}

fn versioned_filter<E: Entity + ?Sized>(
    filter: Filter,
    entity: &E,
    versioned: bool,
    resource: &ResourceType,
) -> RepoResult<Filter> {
    if !versioned {
        return Ok(filter);
    }
    let version = entity.version().ok_or_else(|| {
        RepoError::internal(format!(
            "{} with id {} has no version",
            resource.name(),
            entity.id()
        ))
    })?;
    Ok(filter.with_trailing(Condition::equal(VERSION_COLUMN, version)))
}

async fn run_update<E: Entity + ?Sized>(
    db: &dyn Executor,
    resource: &ResourceType,
    columns: &[String],
    entity: &E,
    versioned: bool,
    filter: &Filter,
) -> RepoResult<u64> {
    let values = entity_values(entity, columns, resource.name())?;
    let raw: &[&str] = if versioned { &[VERSION_INCREMENT] } else { &[] };
    let stmt = StatementBuilder::update(resource.table(), columns, values, raw, filter)?.rebind();
    execute(db, &stmt, resource.name()).await.map_err(|e| {
        e.context(format!(
            "while updating {} with id {}",
            resource.name(),
            entity.id()
        ))
    })
}

fn unexpected_count(resource: &ResourceType, id: &str, affected: u64) -> RepoError {
    tracing::warn!(
        "Update of {} with id {} changed {} rows",
        resource.name(),
        id,
        affected
    );
    RepoError::internal(format!(
        "should update single row, but updated {} rows",
        affected
    ))
}
