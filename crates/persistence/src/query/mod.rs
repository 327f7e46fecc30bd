//! Dynamic SQL construction.
//!
//! - [`Condition`] and [`ConditionTree`]: predicates
//! - [`OrderBy`]: ordering
//! - [`StatementBuilder`]: SELECT/INSERT/UPDATE/DELETE assembly
//! - [`SqlValue`] and [`Row`]: arguments and results
//!
//! # Example
//!
//! ```
//! use tenant_persistence::query::{Condition, Filter, StatementBuilder};
//!
//! let filter = Filter::from(vec![
//!     Condition::equal("tenant_id", "T1"),
//!     Condition::equal("first_name", "Peter"),
//! ]);
//! let stmt = StatementBuilder::select("users", &["id", "first_name"], &filter, &[])
//!     .unwrap()
//!     .rebind();
//!
//! assert_eq!(
//!     stmt.sql,
//!     "SELECT id, first_name FROM users WHERE tenant_id = $1 AND first_name = $2"
//! );
//! ```

mod builder;
pub mod condition;
mod order;
mod value;

pub use builder::{Filter, SqlFragment, Statement, StatementBuilder, rebind, validate_identifier};
pub use condition::{Condition, ConditionTree, and, or, trees_from_conditions};
pub use order::{OrderBy, OrderDirection, order_by_clause};
pub use value::{FromSqlValue, Row, SqlValue};
