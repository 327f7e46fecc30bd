//! INSERT ... ON CONFLICT DO UPDATE primitives.
//!
//! ```sql
//! INSERT INTO users ( id, tenant_id, first_name, last_name, age ) VALUES ( $1, $2, $3, $4, $5 )
//!     ON CONFLICT ( tenant_id, first_name, last_name )
//!     DO UPDATE SET age=EXCLUDED.age WHERE users.tenant_id = $6 RETURNING id
//! ```
//!
//! On a conflict the row is only updated if the caller owns it; otherwise
//! the statement returns no row and the upsert fails as unauthorized.

use super::create::authorize_insert;
use super::{Entity, entity_values, query_rows, to_columns};
use crate::db::Executor;
use crate::error::{RepoError, RepoResult};
use crate::query::{SqlFragment, StatementBuilder, validate_identifier};
use crate::tenant::{
    AccessLevel, ResourceType, Tenancy, TenantAccess, TenantId, TenantScope,
    upsert_tenant_access_recursively,
};

const ID_COLUMN: &str = "id";

/// Inserts or updates a tenant-owned record, keyed by a unique constraint.
#[derive(Debug, Clone)]
pub struct Upserter {
    scope: TenantScope,
    statement: UpsertStatement,
}

impl Upserter {
    /// Creates an upserter inserting `insert_columns`; on a conflict over
    /// `conflicting_columns` it overwrites `update_columns`.
    pub fn new<I, S, J, T, K, U>(
        scope: TenantScope,
        insert_columns: I,
        conflicting_columns: J,
        update_columns: K,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
        K: IntoIterator<Item = U>,
        U: Into<String>,
    {
        Self {
            scope,
            statement: UpsertStatement {
                insert_columns: to_columns(insert_columns),
                conflicting_columns: to_columns(conflicting_columns),
                update_columns: to_columns(update_columns),
            },
        }
    }

    /// Upserts `entity` on behalf of `tenant` and returns the stored row's id,
    /// which is the existing row's id when the upsert updated.
    pub async fn upsert<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        entity: &E,
    ) -> RepoResult<String> {
        let tenant = TenantId::require(tenant)?;
        let resource = self.scope.resource();
        authorize_insert(db, &self.scope, &tenant, entity).await?;

        let owner = self
            .scope
            .predicate(&tenant, AccessLevel::Owner)?
            .qualified(resource.table());
        let mut fragment = self.statement.build(resource, entity)?;
        fragment.push_sql(" WHERE ");
        fragment.append("", owner.render());
        fragment.push_sql(&format!(" RETURNING {}", ID_COLUMN));

        let id = match run_upsert(db, resource, entity, fragment).await? {
            Some(id) => id,
            None => {
                tracing::warn!(
                    "Upsert of {} with id {} hit a row not owned by tenant {}",
                    resource.name(),
                    entity.id(),
                    tenant
                );
                return Err(RepoError::unauthorized(format!(
                    "upsert of {} with id {} updated no rows",
                    resource.name(),
                    entity.id()
                )));
            }
        };

        if matches!(self.scope.tenancy(), Tenancy::AccessTable) && resource.is_top_level() {
            let access_table = resource.require_access_table()?;
            let access = TenantAccess::new(tenant.as_str(), id.as_str(), true);
            upsert_tenant_access_recursively(db, self.scope.config(), access_table, &access)
                .await
                .map_err(|e| {
                    e.context(format!(
                        "while upserting tenant access for {} with id {}",
                        resource.name(),
                        id
                    ))
                })?;
        }
        Ok(id)
    }
}

/// Inserts or updates a record without tenant scoping.
#[derive(Debug, Clone)]
pub struct UpserterGlobal {
    resource: ResourceType,
    statement: UpsertStatement,
}

impl UpserterGlobal {
    /// Creates an upserter inserting `insert_columns`; on a conflict over
    /// `conflicting_columns` it overwrites `update_columns`.
    pub fn new<I, S, J, T, K, U>(
        resource: ResourceType,
        insert_columns: I,
        conflicting_columns: J,
        update_columns: K,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
        K: IntoIterator<Item = U>,
        U: Into<String>,
    {
        Self {
            resource,
            statement: UpsertStatement {
                insert_columns: to_columns(insert_columns),
                conflicting_columns: to_columns(conflicting_columns),
                update_columns: to_columns(update_columns),
            },
        }
    }

    /// Upserts `entity` and returns the stored row's id.
    pub async fn upsert_global<E: Entity + ?Sized>(
        &self,
        db: &dyn Executor,
        entity: &E,
    ) -> RepoResult<String> {
        let mut fragment = self.statement.build(&self.resource, entity)?;
        fragment.push_sql(&format!(" RETURNING {}", ID_COLUMN));
        run_upsert(db, &self.resource, entity, fragment)
            .await?
            .ok_or_else(|| RepoError::internal("should upsert single row, but upserted 0 rows"))
    }
}

#[derive(Debug, Clone)]
struct UpsertStatement {
    insert_columns: Vec<String>,
    conflicting_columns: Vec<String>,
    update_columns: Vec<String>,
}

impl UpsertStatement {
    /// `INSERT ... ON CONFLICT ( ... ) DO UPDATE SET c=EXCLUDED.c, ...`
    fn build<E: Entity + ?Sized>(
        &self,
        resource: &ResourceType,
        entity: &E,
    ) -> RepoResult<SqlFragment> {
        if self.conflicting_columns.is_empty() || self.update_columns.is_empty() {
            return Err(RepoError::internal(format!(
                "upsert of {} needs conflicting and update columns",
                resource.name()
            )));
        }
        for column in self.conflicting_columns.iter().chain(&self.update_columns) {
            validate_identifier(column)?;
        }

        let values = entity_values(entity, &self.insert_columns, resource.name())?;
        let mut fragment = StatementBuilder::insert(resource.table(), &self.insert_columns, values)?;
        let assignments: Vec<String> = self
            .update_columns
            .iter()
            .map(|c| format!("{}=EXCLUDED.{}", c, c))
            .collect();
        fragment.push_sql(&format!(
            " ON CONFLICT ( {} ) DO UPDATE SET {}",
            self.conflicting_columns.join(", "),
            assignments.join(", ")
        ));
        Ok(fragment)
    }
}

/// Runs the upsert and returns the id of the single returned row, or `None`
/// when no row came back.
async fn run_upsert<E: Entity + ?Sized>(
    db: &dyn Executor,
    resource: &ResourceType,
    entity: &E,
    fragment: SqlFragment,
) -> RepoResult<Option<String>> {
    let rows = query_rows(db, &fragment.rebind(), resource.name())
        .await
        .map_err(|e| {
            e.context(format!(
                "while upserting {} with id {}",
                resource.name(),
                entity.id()
            ))
        })?;
    match rows.as_slice() {
        [] => Ok(None),
        [row] => Ok(Some(row.get_at(0)?)),
        _ => {
            tracing::warn!(
                "Upsert of {} with id {} returned {} rows",
                resource.name(),
                entity.id(),
                rows.len()
            );
            Err(RepoError::internal(format!(
                "should upsert single row, but upserted {} rows",
                rows.len()
            )))
        }
    }
}
