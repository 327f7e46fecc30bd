//! SQL predicates.
//!
//! A [`Condition`] renders a single predicate in the intermediate `?`
//! placeholder form together with the arguments it binds, in order. Field
//! names are validated when the statement is built, not here.

// Variant fields and constructors mirror the SQL they render
#![allow(missing_docs)]

use super::SqlValue;
use super::builder::SqlFragment;

/// A single SQL predicate over one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = ?`
    Equal { field: String, value: SqlValue },
    /// `field != ?`
    NotEqual { field: String, value: SqlValue },
    /// `field IS NULL`
    Null { field: String },
    /// `field IS NOT NULL`
    NotNull { field: String },
    /// `field IN (?, ?, ...)`
    In { field: String, values: Vec<SqlValue> },
    /// `field IN (<subquery>)`; the subquery uses `?` placeholders bound to `args`.
    InSubquery {
        field: String,
        subquery: String,
        args: Vec<SqlValue>,
    },
    /// `field NOT IN (?, ?, ...)`
    NotIn { field: String, values: Vec<SqlValue> },
    /// `field LIKE ?`
    Like { field: String, pattern: String },
    /// `field @> ?` on a JSONB column.
    JsonContains { field: String, value: serde_json::Value },
    /// True when the JSONB array in `field` contains any of `values`.
    JsonArrayAnyMatch { field: String, values: Vec<String> },
    /// `field !~ ?`
    NotRegex { field: String, pattern: String },
}

impl Condition {
    pub fn equal(field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Condition::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_equal(field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Condition::NotEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn null(field: impl Into<String>) -> Self {
        Condition::Null {
            field: field.into(),
        }
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Condition::NotNull {
            field: field.into(),
        }
    }

    pub fn in_values<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Condition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn in_subquery(
        field: impl Into<String>,
        subquery: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Self {
        Condition::InSubquery {
            field: field.into(),
            subquery: subquery.into(),
            args,
        }
    }

    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Condition::NotIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Condition::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn json_contains(field: impl Into<String>, value: serde_json::Value) -> Self {
        Condition::JsonContains {
            field: field.into(),
            value,
        }
    }

    pub fn json_array_any_match<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::JsonArrayAnyMatch {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Condition::NotRegex {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Returns the column this condition filters on.
    pub fn field(&self) -> &str {
        match self {
            Condition::Equal { field, .. }
            | Condition::NotEqual { field, .. }
            | Condition::Null { field }
            | Condition::NotNull { field }
            | Condition::In { field, .. }
            | Condition::InSubquery { field, .. }
            | Condition::NotIn { field, .. }
            | Condition::Like { field, .. }
            | Condition::JsonContains { field, .. }
            | Condition::JsonArrayAnyMatch { field, .. }
            | Condition::NotRegex { field, .. } => field,
        }
    }

    /// Prefixes the field with `table.` unless it is already qualified.
    pub fn qualified(mut self, table: &str) -> Self {
        let field = self.field_mut();
        if !field.contains('.') {
            *field = format!("{}.{}", table, field);
        }
        self
    }

    fn field_mut(&mut self) -> &mut String {
        match self {
            Condition::Equal { field, .. }
            | Condition::NotEqual { field, .. }
            | Condition::Null { field }
            | Condition::NotNull { field }
            | Condition::In { field, .. }
            | Condition::InSubquery { field, .. }
            | Condition::NotIn { field, .. }
            | Condition::Like { field, .. }
            | Condition::JsonContains { field, .. }
            | Condition::JsonArrayAnyMatch { field, .. }
            | Condition::NotRegex { field, .. } => field,
        }
    }

    /// Renders the predicate with `?` placeholders.
    ///
    /// An empty `In` list renders `FALSE` and an empty `NotIn` list renders
    /// `TRUE`, so the predicate keeps its meaning instead of producing
    /// invalid SQL.
    pub fn render(&self) -> SqlFragment {
        match self {
            Condition::Equal { field, value } => {
                SqlFragment::with_args(format!("{} = ?", field), vec![value.clone()])
            }
            Condition::NotEqual { field, value } => {
                SqlFragment::with_args(format!("{} != ?", field), vec![value.clone()])
            }
            Condition::Null { field } => SqlFragment::new(format!("{} IS NULL", field)),
            Condition::NotNull { field } => SqlFragment::new(format!("{} IS NOT NULL", field)),
            Condition::In { field, values } => {
                if values.is_empty() {
                    return SqlFragment::new("FALSE");
                }
                SqlFragment::with_args(
                    format!("{} IN ({})", field, placeholders(values.len())),
                    values.clone(),
                )
            }
            Condition::InSubquery {
                field,
                subquery,
                args,
            } => SqlFragment::with_args(format!("{} IN ({})", field, subquery), args.clone()),
            Condition::NotIn { field, values } => {
                if values.is_empty() {
                    return SqlFragment::new("TRUE");
                }
                SqlFragment::with_args(
                    format!("{} NOT IN ({})", field, placeholders(values.len())),
                    values.clone(),
                )
            }
            Condition::Like { field, pattern } => SqlFragment::with_args(
                format!("{} LIKE ?", field),
                vec![SqlValue::text(pattern.as_str())],
            ),
            Condition::JsonContains { field, value } => SqlFragment::with_args(
                format!("{} @> ?", field),
                vec![SqlValue::Json(value.clone())],
            ),
            // jsonb_exists_any is the function behind `?|`, which would clash
            // with the placeholder syntax.
            Condition::JsonArrayAnyMatch { values, .. } if values.is_empty() => {
                SqlFragment::new("FALSE")
            }
            Condition::JsonArrayAnyMatch { field, values } => SqlFragment::with_args(
                format!(
                    "jsonb_exists_any({}, array[{}])",
                    field,
                    placeholders(values.len())
                ),
                values.iter().map(SqlValue::text).collect(),
            ),
            Condition::NotRegex { field, pattern } => SqlFragment::with_args(
                format!("{} !~ ?", field),
                vec![SqlValue::text(pattern.as_str())],
            ),
        }
    }
}

/// A boolean combination of conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionTree {
    Leaf(Condition),
    And(Vec<ConditionTree>),
    Or(Vec<ConditionTree>),
}

impl ConditionTree {
    /// Renders the tree. Groups are parenthesised; a group with a single
    /// child renders as that child.
    pub fn render(&self) -> SqlFragment {
        match self {
            ConditionTree::Leaf(condition) => condition.render(),
            ConditionTree::And(children) => render_group(children, " AND ", "TRUE"),
            ConditionTree::Or(children) => render_group(children, " OR ", "FALSE"),
        }
    }

    /// Returns every leaf condition, depth first.
    pub fn leaves(&self) -> Vec<&Condition> {
        match self {
            ConditionTree::Leaf(condition) => vec![condition],
            ConditionTree::And(children) | ConditionTree::Or(children) => {
                children.iter().flat_map(ConditionTree::leaves).collect()
            }
        }
    }
}

impl From<Condition> for ConditionTree {
    fn from(condition: Condition) -> Self {
        ConditionTree::Leaf(condition)
    }
}

/// Joins the trees with AND.
pub fn and(children: Vec<ConditionTree>) -> ConditionTree {
    ConditionTree::And(children)
}

/// Joins the trees with OR.
pub fn or(children: Vec<ConditionTree>) -> ConditionTree {
    ConditionTree::Or(children)
}

/// Wraps each condition in a leaf.
pub fn trees_from_conditions(conditions: Vec<Condition>) -> Vec<ConditionTree> {
    conditions.into_iter().map(ConditionTree::Leaf).collect()
}

fn render_group(children: &[ConditionTree], separator: &str, empty: &str) -> SqlFragment {
    match children {
        [] => SqlFragment::new(empty),
        [only] => only.render(),
        _ => {
            let rendered: Vec<SqlFragment> = children.iter().map(ConditionTree::render).collect();
            let sql = rendered
                .iter()
                .map(|f| f.sql.as_str())
                .collect::<Vec<_>>()
                .join(separator);
            let args = rendered.into_iter().flat_map(|f| f.args).collect();
            SqlFragment::with_args(format!("({})", sql), args)
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
