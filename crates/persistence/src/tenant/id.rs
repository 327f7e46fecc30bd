//! Tenant identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};
use crate::query::SqlValue;

/// An opaque, non-empty tenant identifier.
///
/// Tenant-scoped repository operations take the caller's tenant as a plain
/// string and turn it into a `TenantId` with [`TenantId::require`] before any
/// statement is built, so an empty tenant can never produce an unscoped query.
///
/// # Examples
///
/// ```
/// use tenant_persistence::tenant::TenantId;
///
/// let tenant = TenantId::require("3e64ebae-38b5-46a0-b1ed-9ccee153a0ae").unwrap();
/// assert_eq!(tenant.as_str(), "3e64ebae-38b5-46a0-b1ed-9ccee153a0ae");
///
/// assert!(TenantId::require("").unwrap_err().is_tenant_required());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Validates `id`, failing with [`RepoError::TenantRequired`] when it is
    /// empty or whitespace.
    pub fn require(id: &str) -> RepoResult<Self> {
        if id.trim().is_empty() {
            return Err(RepoError::TenantRequired);
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&TenantId> for SqlValue {
    fn from(id: &TenantId) -> Self {
        SqlValue::Text(id.0.clone())
    }
}
