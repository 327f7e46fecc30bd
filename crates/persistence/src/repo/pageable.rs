//! Cursor-paginated SELECT primitives.
//!
//! A page costs two round trips on the same handle: the page itself
//! (`... ORDER BY ... LIMIT n OFFSET m`) and a `COUNT(*)` over the same
//! predicates. The two statements are not snapshot-consistent unless the
//! caller runs them inside a REPEATABLE READ or SERIALIZABLE transaction.

use super::{FromRow, decode_rows, query_one, query_rows, to_columns};
use crate::db::Executor;
use crate::error::{RepoError, RepoResult};
use crate::query::{Filter, OrderBy, StatementBuilder};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};
use crate::types::{Page, PageInfo, decode_cursor, validate_page_size};

/// Pages through records visible to a tenant.
#[derive(Debug, Clone)]
pub struct PageableQuerier {
    scope: TenantScope,
    columns: Vec<String>,
}

impl PageableQuerier {
    /// Creates a querier selecting `columns` from the scope's table.
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

    /// Returns the page at `cursor` of the records matching `filter` for `tenant`.
    pub async fn list<T: FromRow>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
        page_size: usize,
        cursor: &str,
    ) -> RepoResult<Page<T>> {
        let tenant = TenantId::require(tenant)?;
        let filter = self.scope.restrict(&tenant, filter.into(), AccessLevel::Read)?;
        list_page(
            db,
            self.scope.resource(),
            &self.columns,
            &filter,
            order_by,
            page_size,
            cursor,
        )
        .await
    }
}

/// Pages through records without tenant scoping.
#[derive(Debug, Clone)]
pub struct PageableQuerierGlobal {
    resource: ResourceType,
    columns: Vec<String>,
}

impl PageableQuerierGlobal {
    /// Creates a querier selecting `columns` from the resource type's table.
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

    /// Returns the page at `cursor` of the records matching `filter`.
    pub async fn list_global<T: FromRow>(
        &self,
        db: &dyn Executor,
        filter: impl Into<Filter>,
        order_by: &[OrderBy],
        page_size: usize,
        cursor: &str,
    ) -> RepoResult<Page<T>> {
        list_page(
            db,
            &self.resource,
            &self.columns,
            &filter.into(),
            order_by,
            page_size,
            cursor,
        )
        .await
    }
}

/// Fails unless `order_by` names at least one column; offset paging over an
/// unspecified order may skip or repeat rows.
pub(crate) fn require_order(order_by: &[OrderBy]) -> RepoResult<()> {
    if order_by.is_empty() {
        return Err(RepoError::internal(
            "paginated queries require an explicit order",
        ));
    }
    Ok(())
}

async fn list_page<T: FromRow>(
    db: &dyn Executor,
    resource: &ResourceType,
    columns: &[String],
    filter: &Filter,
    order_by: &[OrderBy],
    page_size: usize,
    cursor: &str,
) -> RepoResult<Page<T>> {
    let offset = decode_cursor(cursor).map_err(|e| e.context("while decoding page cursor"))?;
    validate_page_size(page_size)?;
    require_order(order_by)?;

    let mut data = StatementBuilder::select(resource.table(), columns, filter, order_by)?;
    data.push_sql(&format!(" LIMIT {} OFFSET {}", page_size, offset));
    let rows = query_rows(db, &data.rebind(), resource.name())
        .await
        .map_err(|e| e.context(format!("while fetching page of {}", resource.name())))?;
    let items: Vec<T> = decode_rows(&rows)?;

    let count = StatementBuilder::select_count(resource.table(), filter)?.rebind();
    let total_count: i64 = query_one(db, &count, resource.name())
        .await
        .map_err(|e| e.context(format!("while counting {}", resource.name())))?
        .get_at(0)?;
    let total_count = usize::try_from(total_count)
        .map_err(|_| RepoError::internal(format!("negative count {}", total_count)))?;

    Ok(Page {
        page_info: PageInfo::compute(cursor, offset, page_size, items.len(), total_count),
        items,
        total_count,
    })
}
