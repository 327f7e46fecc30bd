//! Generic CRUD primitives.
//!
//! Domain repositories are built from these building blocks. Each primitive
//! is configured once with its table, columns and [`TenantScope`], and each
//! call takes the active database handle and, for tenant-scoped variants, the
//! caller's tenant. Tenant-scoped statements always start their `WHERE`
//! clause with the tenant isolation predicate; the `*Global` variants never
//! add one.
//!
//! | Primitive | Tenant-scoped | Global |
//! |-----------|---------------|--------|
//! | create | [`Creator`] | [`CreatorGlobal`] |
//! | get one row | [`SingleGetter`] | [`SingleGetterGlobal`] |
//! | list rows | [`Lister`] | [`ListerGlobal`] |
//! | update one row | [`Updater`] | [`UpdaterGlobal`] |
//! | delete | [`Deleter`] | [`DeleterGlobal`] |
//! | existence check | [`ExistQuerier`] | [`ExistQuerierGlobal`] |
//! | page + count | [`PageableQuerier`] | [`PageableQuerierGlobal`] |
//! | union of pages | [`UnionLister`] | [`UnionListerGlobal`] |
//! | upsert | [`Upserter`] | [`UpserterGlobal`] |
//!
//! [`TenantScope`]: crate::tenant::TenantScope

mod create;
mod delete;
mod exist;
mod get;
mod list;
mod pageable;
mod union;
mod update;
mod upsert;

pub use create::{Creator, CreatorGlobal};
pub use delete::{Deleter, DeleterGlobal};
pub use exist::{ExistQuerier, ExistQuerierGlobal};
pub use get::{SingleGetter, SingleGetterGlobal};
pub use list::{Lister, ListerGlobal};
pub use pageable::{PageableQuerier, PageableQuerierGlobal};
pub use union::{UnionLister, UnionListerGlobal, UnionPage};
pub use update::{Updater, UpdaterGlobal};
pub use upsert::{Upserter, UpserterGlobal};

use crate::db::Executor;
use crate::error::{RepoError, RepoResult, map_driver_error};
use crate::query::{Row, SqlValue, Statement};
use crate::tenant::ParentRef;

/// A record that can be written by the repository primitives.
///
/// The mapping from column names to field values is explicit: `value`
/// returns the bound value for a column, or `None` if the record has no such
/// column.
pub trait Entity: Send + Sync {
    /// The primary key.
    fn id(&self) -> &str;

    /// The value of `column`.
    fn value(&self, column: &str) -> Option<SqlValue>;

    /// The record this one belongs to, for child resources.
    fn parent(&self) -> Option<ParentRef> {
        None
    }

    /// The optimistic-concurrency version, for versioned records.
    fn version(&self) -> Option<i64> {
        None
    }
}

/// A record that can be read from a result row.
pub trait FromRow: Sized {
    /// Builds the record from `row`.
    fn from_row(row: &Row) -> RepoResult<Self>;
}

/// Collects the values of `columns` from `entity`.
pub(crate) fn entity_values<E: Entity + ?Sized, C: AsRef<str>>(
    entity: &E,
    columns: &[C],
    resource: &str,
) -> RepoResult<Vec<SqlValue>> {
    columns
        .iter()
        .map(|column| {
            entity.value(column.as_ref()).ok_or_else(|| {
                RepoError::internal(format!(
                    "{} entity has no value for column {}",
                    resource,
                    column.as_ref()
                ))
            })
        })
        .collect()
}

pub(crate) fn to_columns<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns.into_iter().map(Into::into).collect()
}

pub(crate) async fn query_rows(
    db: &dyn Executor,
    stmt: &Statement,
    resource: &str,
) -> RepoResult<Vec<Row>> {
    tracing::debug!("Executing query on {}: {} ({} args)", resource, stmt.sql, stmt.args.len());
    db.query(&stmt.sql, &stmt.args)
        .await
        .map_err(|e| map_driver_error(e, resource))
}

pub(crate) async fn query_one(db: &dyn Executor, stmt: &Statement, resource: &str) -> RepoResult<Row> {
    tracing::debug!("Executing query on {}: {} ({} args)", resource, stmt.sql, stmt.args.len());
    db.query_one(&stmt.sql, &stmt.args)
        .await
        .map_err(|e| map_driver_error(e, resource))
}

pub(crate) async fn execute(db: &dyn Executor, stmt: &Statement, resource: &str) -> RepoResult<u64> {
    tracing::debug!("Executing statement on {}: {} ({} args)", resource, stmt.sql, stmt.args.len());
    db.execute(&stmt.sql, &stmt.args)
        .await
        .map_err(|e| map_driver_error(e, resource))
}

pub(crate) fn decode_rows<T: FromRow>(rows: &[Row]) -> RepoResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}
