//! Paged listing across many parent keys in one round trip.
//!
//! For parents `A` and `B` the data statement is
//!
//! ```sql
//! (SELECT ... WHERE <tenant> AND <conditions> AND app_id = $2 ORDER BY ... LIMIT $3 OFFSET $4)
//! UNION
//! (SELECT ... WHERE <tenant> AND <conditions> AND app_id = $6 ORDER BY ... LIMIT $7 OFFSET $8)
//! ```
//!
//! and the per-parent totals come from a single grouped count:
//!
//! ```sql
//! SELECT app_id AS id, COUNT(*) AS total_count FROM ... WHERE <tenant> AND <conditions>
//!     AND app_id IN ($2, $3) GROUP BY app_id ORDER BY app_id ASC
//! ```

use std::collections::HashMap;

use super::pageable::require_order;
use super::{FromRow, decode_rows, query_rows, to_columns};
use crate::db::Executor;
use crate::error::{RepoError, RepoResult};
use crate::query::{
    Condition, Filter, OrderBy, SqlFragment, SqlValue, StatementBuilder, validate_identifier,
};
use crate::tenant::{AccessLevel, ResourceType, TenantId, TenantScope};
use crate::types::{Page, PageInfo, decode_cursor, validate_page_size};

/// The rows of a union listing and the total match count of every parent.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionPage<T> {
    /// Rows of all parents, at most `page_size` per parent, in no particular order.
    pub items: Vec<T>,
    /// Total matching rows per requested parent id; parents without rows map to 0.
    pub total_counts: HashMap<String, usize>,
    cursor: String,
    offset: usize,
    page_size: usize,
}

impl<T> UnionPage<T> {
    fn empty(cursor: &str, offset: usize, page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            total_counts: HashMap::new(),
            cursor: cursor.to_string(),
            offset,
            page_size,
        }
    }

    /// Total matching rows for `parent_id`.
    pub fn total_count(&self, parent_id: &str) -> usize {
        self.total_counts.get(parent_id).copied().unwrap_or(0)
    }

    /// Page metadata for `parent_id`, given how many of its rows were returned.
    pub fn page_info_for(&self, parent_id: &str, returned: usize) -> PageInfo {
        PageInfo::compute(
            &self.cursor,
            self.offset,
            self.page_size,
            returned,
            self.total_count(parent_id),
        )
    }

    /// Splits the rows into one [`Page`] per requested parent, using
    /// `parent_of` to read each row's parent id.
    pub fn into_pages<F>(self, parent_of: F) -> HashMap<String, Page<T>>
    where
        F: Fn(&T) -> String,
    {
        let mut grouped: HashMap<String, Vec<T>> = self
            .total_counts
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        for item in self.items {
            grouped.entry(parent_of(&item)).or_default().push(item);
        }

        grouped
            .into_iter()
            .map(|(id, items)| {
                let total_count = self.total_counts.get(&id).copied().unwrap_or(0);
                let page_info = PageInfo::compute(
                    &self.cursor,
                    self.offset,
                    self.page_size,
                    items.len(),
                    total_count,
                );
                (
                    id,
                    Page {
                        items,
                        page_info,
                        total_count,
                    },
                )
            })
            .collect()
    }
}

/// Lists records visible to a tenant for many parents at once.
#[derive(Debug, Clone)]
pub struct UnionLister {
    scope: TenantScope,
    columns: Vec<String>,
}

impl UnionLister {
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

    /// Returns up to `page_size` rows per id in `ids` (matched on
    /// `id_column`), starting at `cursor`, plus every id's total.
    #[allow(clippy::too_many_arguments)]
    pub async fn list<T: FromRow>(
        &self,
        db: &dyn Executor,
        tenant: &str,
        ids: &[String],
        id_column: &str,
        page_size: usize,
        cursor: &str,
        order_by: &[OrderBy],
        filter: impl Into<Filter>,
    ) -> RepoResult<UnionPage<T>> {
        let tenant = TenantId::require(tenant)?;
        let filter = self.scope.restrict(&tenant, filter.into(), AccessLevel::Read)?;
        let request = UnionRequest {
            resource: self.scope.resource(),
            columns: &self.columns,
            ids,
            id_column,
            page_size,
            cursor,
            order_by,
        };
        request.run(db, &filter).await
    }
}

/// Lists records for many parents at once, without tenant scoping.
#[derive(Debug, Clone)]
pub struct UnionListerGlobal {
    resource: ResourceType,
    columns: Vec<String>,
}

impl UnionListerGlobal {
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

    /// Returns up to `page_size` rows per id in `ids` (matched on
    /// `id_column`), starting at `cursor`, plus every id's total.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_global<T: FromRow>(
        &self,
        db: &dyn Executor,
        ids: &[String],
        id_column: &str,
        page_size: usize,
        cursor: &str,
        order_by: &[OrderBy],
        filter: impl Into<Filter>,
    ) -> RepoResult<UnionPage<T>> {
        let request = UnionRequest {
            resource: &self.resource,
            columns: &self.columns,
            ids,
            id_column,
            page_size,
            cursor,
            order_by,
        };
        request.run(db, &filter.into()).await
    }
}

struct UnionRequest<'a> {
    resource: &'a ResourceType,
    columns: &'a [String],
    ids: &'a [String],
    id_column: &'a str,
    page_size: usize,
    cursor: &'a str,
    order_by: &'a [OrderBy],
}

impl UnionRequest<'_> {
    async fn run<T: FromRow>(&self, db: &dyn Executor, filter: &Filter) -> RepoResult<UnionPage<T>> {
        let offset =
            decode_cursor(self.cursor).map_err(|e| e.context("while decoding page cursor"))?;
        validate_page_size(self.page_size)?;
        require_order(self.order_by)?;
        validate_identifier(self.id_column)?;

        let mut page = UnionPage::empty(self.cursor, offset, self.page_size);
        if self.ids.is_empty() {
            return Ok(page);
        }

        let data = self.data_statement(filter, offset)?.rebind();
        let rows = query_rows(db, &data, self.resource.name())
            .await
            .map_err(|e| e.context(format!("while listing {} by {}", self.resource.name(), self.id_column)))?;
        page.items = decode_rows(&rows)?;

        let count = self.count_statement(filter)?.rebind();
        let count_rows = query_rows(db, &count, self.resource.name())
            .await
            .map_err(|e| e.context(format!("while counting {} by {}", self.resource.name(), self.id_column)))?;

        page.total_counts = self.ids.iter().map(|id| (id.clone(), 0)).collect();
        for row in &count_rows {
            let id: String = row.get_at(0)?;
            let total: i64 = row.get_at(1)?;
            let total = usize::try_from(total)
                .map_err(|_| RepoError::internal(format!("negative count {} for {}", total, id)))?;
            page.total_counts.insert(id, total);
        }
        Ok(page)
    }

    fn data_statement(&self, filter: &Filter, offset: usize) -> RepoResult<SqlFragment> {
        let mut union: Option<SqlFragment> = None;
        for id in self.ids {
            let per_parent = filter
                .clone()
                .with_trailing(Condition::equal(self.id_column, id.as_str()));
            let mut select = StatementBuilder::select(
                self.resource.table(),
                self.columns,
                &per_parent,
                self.order_by,
            )?;
            select.append(
                " ",
                SqlFragment::with_args(
                    "LIMIT ? OFFSET ?",
                    vec![SqlValue::from(self.page_size), SqlValue::from(offset)],
                ),
            );

            let mut wrapped = SqlFragment::new("(");
            wrapped.append("", select);
            wrapped.push_sql(")");

            match union.as_mut() {
                Some(acc) => acc.append(" UNION ", wrapped),
                None => union = Some(wrapped),
            }
        }
        union.ok_or_else(|| RepoError::internal("union listing requires at least one id"))
    }

    fn count_statement(&self, filter: &Filter) -> RepoResult<SqlFragment> {
        let grouped = filter
            .clone()
            .with_trailing(Condition::in_values(self.id_column, self.ids.iter()));
        let mut count = SqlFragment::new(format!(
            "SELECT {} AS id, COUNT(*) AS total_count FROM {}",
            self.id_column,
            self.resource.table()
        ));
        validate_identifier(self.resource.table())?;
        count.append("", grouped.where_clause()?);
        count.push_sql(&format!(
            " GROUP BY {} ORDER BY {} ASC",
            self.id_column, self.id_column
        ));
        Ok(count)
    }
}
