//! Statement builder.
//!
//! Statements are assembled in an intermediate form where every argument is a
//! `?` placeholder. Fragments can be concatenated freely in that form (the
//! union lister glues many sub-selects together) and are numbered exactly
//! once, left to right, by [`SqlFragment::rebind`] into PostgreSQL `$N`
//! placeholders.
//!
//! Table and column names are validated against a strict identifier pattern;
//! values only ever travel as bound arguments.

use std::sync::LazyLock;

use regex::Regex;

use super::condition::{Condition, ConditionTree};
use super::order::{OrderBy, order_by_clause};
use super::SqlValue;
use crate::error::{RepoError, RepoResult};

static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").ok()
});

/// A SQL fragment in `?` placeholder form with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL text with `?` placeholders.
    pub sql: String,
    /// The arguments, one per placeholder, in order.
    pub args: Vec<SqlValue>,
}

impl SqlFragment {
    /// Creates a fragment with no arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Creates a fragment with arguments.
    pub fn with_args(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Appends another fragment, separated by `separator`.
    pub fn append(&mut self, separator: &str, other: SqlFragment) {
        self.sql.push_str(separator);
        self.sql.push_str(&other.sql);
        self.args.extend(other.args);
    }

    /// Appends raw SQL that binds no arguments.
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Counts the `?` placeholders outside of string literals.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    /// Numbers the placeholders and returns the driver-ready statement.
    pub fn rebind(self) -> Statement {
        Statement {
            sql: rebind(&self.sql),
            args: self.args,
        }
    }
}

/// A driver-ready statement with `$N` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// The SQL text.
    pub sql: String,
    /// Positional arguments; `args[0]` binds `$1`.
    pub args: Vec<SqlValue>,
}

/// Replaces each `?` outside single-quoted literals with `$1`, `$2`, ...
pub fn rebind(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut n = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}

fn count_placeholders(sql: &str) -> usize {
    let mut in_literal = false;
    let mut n = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => n += 1,
            _ => {}
        }
    }
    n
}

/// Fails with an internal error unless `name` is a plain or qualified identifier.
pub fn validate_identifier(name: &str) -> RepoResult<()> {
    if IDENTIFIER.as_ref().is_some_and(|re| re.is_match(name)) {
        Ok(())
    } else {
        Err(RepoError::internal(format!("invalid SQL identifier: {:?}", name)))
    }
}

/// The predicate part of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Conditions joined with `AND`, unparenthesised.
    All(Vec<Condition>),
    /// An arbitrary boolean tree.
    Tree(ConditionTree),
}

impl Filter {
    /// A filter that matches every row.
    pub fn none() -> Self {
        Filter::All(Vec::new())
    }

    /// Returns a filter with `condition` evaluated first.
    pub fn with_leading(self, condition: Condition) -> Self {
        match self {
            Filter::All(mut conditions) => {
                conditions.insert(0, condition);
                Filter::All(conditions)
            }
            Filter::Tree(tree) => Filter::Tree(ConditionTree::And(vec![
                ConditionTree::Leaf(condition),
                tree,
            ])),
        }
    }

    /// Returns a filter with `condition` evaluated last.
    pub fn with_trailing(self, condition: Condition) -> Self {
        match self {
            Filter::All(mut conditions) => {
                conditions.push(condition);
                Filter::All(conditions)
            }
            Filter::Tree(tree) => Filter::Tree(ConditionTree::And(vec![
                tree,
                ConditionTree::Leaf(condition),
            ])),
        }
    }

    /// Returns the leaf conditions in evaluation order.
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            Filter::All(conditions) => conditions.iter().collect(),
            Filter::Tree(tree) => tree.leaves(),
        }
    }

    /// Renders the `WHERE` clause (with a leading space), or an empty fragment.
    ///
    /// Every condition is checked before rendering: its field must be a valid
    /// identifier and it must bind exactly as many arguments as it renders
    /// placeholders. A mismatch is an internal error; no predicate is dropped.
    pub fn where_clause(&self) -> RepoResult<SqlFragment> {
        for condition in self.conditions() {
            check_condition(condition)?;
        }
        let body = match self {
            Filter::All(conditions) if conditions.is_empty() => return Ok(SqlFragment::new("")),
            Filter::All(conditions) => {
                let mut rendered = conditions.iter().map(Condition::render);
                let mut body = rendered.next().unwrap_or_else(|| SqlFragment::new("TRUE"));
                for fragment in rendered {
                    body.append(" AND ", fragment);
                }
                body
            }
            Filter::Tree(tree) => tree.render(),
        };
        let mut clause = SqlFragment::new(" WHERE ");
        clause.append("", body);
        Ok(clause)
    }
}

impl From<Vec<Condition>> for Filter {
    fn from(conditions: Vec<Condition>) -> Self {
        Filter::All(conditions)
    }
}

impl From<Condition> for Filter {
    fn from(condition: Condition) -> Self {
        Filter::All(vec![condition])
    }
}

impl From<ConditionTree> for Filter {
    fn from(tree: ConditionTree) -> Self {
        Filter::Tree(tree)
    }
}

fn check_condition(condition: &Condition) -> RepoResult<()> {
    validate_identifier(condition.field())?;
    let fragment = condition.render();
    let placeholders = fragment.placeholder_count();
    if placeholders != fragment.args.len() {
        return Err(RepoError::internal(format!(
            "condition on {} renders {} placeholders but binds {} arguments",
            condition.field(),
            placeholders,
            fragment.args.len()
        )));
    }
    Ok(())
}

fn column_list<C: AsRef<str>>(columns: &[C]) -> RepoResult<String> {
    if columns.is_empty() {
        return Err(RepoError::internal("column list must not be empty"));
    }
    for column in columns {
        validate_identifier(column.as_ref())?;
    }
    Ok(columns
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", "))
}

/// Builds SELECT/INSERT/UPDATE/DELETE statements in `?` form.
pub struct StatementBuilder;

impl StatementBuilder {
    /// `SELECT <columns> FROM <table> [WHERE ...] [ORDER BY ...]`
    pub fn select<C: AsRef<str>>(
        table: &str,
        columns: &[C],
        filter: &Filter,
        order_by: &[OrderBy],
    ) -> RepoResult<SqlFragment> {
        Self::select_expr(table, &column_list(columns)?, filter, order_by)
    }

    /// `SELECT 1 FROM <table> [WHERE ...] LIMIT 1`
    pub fn select_exists(table: &str, filter: &Filter) -> RepoResult<SqlFragment> {
        let mut fragment = Self::select_expr(table, "1", filter, &[])?;
        fragment.push_sql(" LIMIT 1");
        Ok(fragment)
    }

    /// `SELECT COUNT(*) FROM <table> [WHERE ...]`
    pub fn select_count(table: &str, filter: &Filter) -> RepoResult<SqlFragment> {
        Self::select_expr(table, "COUNT(*)", filter, &[])
    }

    fn select_expr(
        table: &str,
        expr: &str,
        filter: &Filter,
        order_by: &[OrderBy],
    ) -> RepoResult<SqlFragment> {
        validate_identifier(table)?;
        for order in order_by {
            validate_identifier(&order.field)?;
        }

        let mut fragment = SqlFragment::new(format!("SELECT {} FROM {}", expr, table));
        fragment.append("", filter.where_clause()?);
        let order = order_by_clause(order_by);
        if !order.is_empty() {
            fragment.push_sql(" ");
            fragment.push_sql(&order);
        }
        Ok(fragment)
    }

    /// `INSERT INTO <table> ( a, b ) VALUES ( ?, ? )`
    pub fn insert<C: AsRef<str>>(
        table: &str,
        columns: &[C],
        values: Vec<SqlValue>,
    ) -> RepoResult<SqlFragment> {
        validate_identifier(table)?;
        let list = column_list(columns)?;
        if values.len() != columns.len() {
            return Err(RepoError::internal(format!(
                "insert into {} has {} columns but {} values",
                table,
                columns.len(),
                values.len()
            )));
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        Ok(SqlFragment::with_args(
            format!(
                "INSERT INTO {} ( {} ) VALUES ( {} )",
                table, list, placeholders
            ),
            values,
        ))
    }

    /// `UPDATE <table> SET a = ?, b = ?[, <raw>...] [WHERE ...]`
    ///
    /// `raw_assignments` are appended verbatim after the bound ones, for
    /// expressions such as `version = version+1`.
    pub fn update<C: AsRef<str>>(
        table: &str,
        columns: &[C],
        values: Vec<SqlValue>,
        raw_assignments: &[&str],
        filter: &Filter,
    ) -> RepoResult<SqlFragment> {
        validate_identifier(table)?;
        column_list(columns)?;
        if values.len() != columns.len() {
            return Err(RepoError::internal(format!(
                "update of {} has {} columns but {} values",
                table,
                columns.len(),
                values.len()
            )));
        }

        let assignments: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = ?", c.as_ref()))
            .chain(raw_assignments.iter().map(|a| (*a).to_string()))
            .collect();
        let mut fragment = SqlFragment::with_args(
            format!("UPDATE {} SET {}", table, assignments.join(", ")),
            values,
        );
        fragment.append("", filter.where_clause()?);
        Ok(fragment)
    }

    /// `DELETE FROM <table> [WHERE ...]`
    pub fn delete(table: &str, filter: &Filter) -> RepoResult<SqlFragment> {
        validate_identifier(table)?;
        let mut fragment = SqlFragment::new(format!("DELETE FROM {}", table));
        fragment.append("", filter.where_clause()?);
        Ok(fragment)
    }
}
