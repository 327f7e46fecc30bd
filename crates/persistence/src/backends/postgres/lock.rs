//! Transaction-scoped advisory locks.

use crate::db::Executor;
use crate::error::{RepoResult, map_driver_error};
use crate::query::SqlValue;

/// Tries to take the transaction-level advisory lock `key` without waiting.
///
/// Returns `false` if another transaction holds it. The lock is released
/// when the surrounding transaction ends, so `db` should be a transaction.
pub async fn try_advisory_xact_lock(db: &dyn Executor, key: i64) -> RepoResult<bool> {
    let row = db
        .query_one("SELECT pg_try_advisory_xact_lock($1)", &[SqlValue::Integer(key)])
        .await
        .map_err(|e| map_driver_error(e, "advisory lock"))?;
    let acquired: bool = row.get_at(0)?;
    if !acquired {
        tracing::debug!("Advisory lock {} is held by another transaction", key);
    }
    Ok(acquired)
}
