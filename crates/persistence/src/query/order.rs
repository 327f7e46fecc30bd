//! Result ordering.

use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => f.write_str("ASC"),
            OrderDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// One column of an `ORDER BY` clause.
///
/// A sequence of these is a tie-break chain. Paginated queries need at least
/// one column that makes the order total, typically the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Ascending order on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// Renders `ORDER BY a ASC, b DESC`, or an empty string for no ordering.
pub fn order_by_clause(order_by: &[OrderBy]) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let columns: Vec<String> = order_by.iter().map(ToString::to_string).collect();
    format!("ORDER BY {}", columns.join(", "))
}
