//! Error types for the data-access core.
//!
//! Every repository primitive returns [`RepoError`]. Driver-level failures are
//! classified exactly once, at the primitive's boundary, by
//! [`map_driver_error`]; no driver error type ever escapes the crate.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::db::{DriverError, DriverErrorKind};

/// Message used when an owner-scoped mutation touched no rows.
pub const SHOULD_BE_OWNER_MSG: &str = "owner access is needed for resource modification";

/// The error type for all repository operations.
#[derive(Error, Debug)]
pub enum RepoError {
    /// No row matched.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// A unique constraint was violated.
    #[error("{resource} is not unique")]
    NotUnique {
        resource: String,
        constraint: Option<String>,
    },

    /// A NOT NULL constraint was violated.
    #[error("{resource} has a required field that is null")]
    NotNullViolation {
        resource: String,
        column: Option<String>,
    },

    /// A CHECK constraint was violated.
    #[error("{resource} violates a check constraint")]
    CheckViolation {
        resource: String,
        constraint: Option<String>,
    },

    /// The operation is not allowed in the current state (foreign key violations).
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// A tenant-scoped operation was called without a tenant.
    #[error("tenant is required")]
    TenantRequired,

    /// The caller's tenant is not the owner of the row it tried to mutate.
    #[error("{}: {message}", SHOULD_BE_OWNER_MSG)]
    Unauthorized { message: String },

    /// The caller supplied malformed input (cursor, page size).
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Anything unrecognised, including inconsistent builder state.
    #[error("internal server error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Diagnostic context around another repository error.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<RepoError>,
    },
}

/// The classification of a [`RepoError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotUnique,
    NotNullViolation,
    CheckViolation,
    InvalidOperation,
    TenantRequired,
    Unauthorized,
    InvalidData,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::NotUnique => "not-unique",
            ErrorKind::NotNullViolation => "not-null-violation",
            ErrorKind::CheckViolation => "check-violation",
            ErrorKind::InvalidOperation => "invalid-operation",
            ErrorKind::TenantRequired => "tenant-required",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidData => "invalid-data",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl RepoError {
    /// Creates an internal error without a source.
    pub fn internal(message: impl Into<String>) -> Self {
        RepoError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        RepoError::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        RepoError::InvalidData {
            message: message.into(),
        }
    }

    /// Creates a not found error for the given resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        RepoError::NotFound {
            resource: resource.into(),
        }
    }

    /// Wraps this error with diagnostic context. The kind is preserved.
    pub fn context(self, context: impl Into<String>) -> Self {
        RepoError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the kind of this error, looking through any context wrapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::NotFound { .. } => ErrorKind::NotFound,
            RepoError::NotUnique { .. } => ErrorKind::NotUnique,
            RepoError::NotNullViolation { .. } => ErrorKind::NotNullViolation,
            RepoError::CheckViolation { .. } => ErrorKind::CheckViolation,
            RepoError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            RepoError::TenantRequired => ErrorKind::TenantRequired,
            RepoError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RepoError::InvalidData { .. } => ErrorKind::InvalidData,
            RepoError::Internal { .. } => ErrorKind::Internal,
            RepoError::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_not_unique(&self) -> bool {
        self.kind() == ErrorKind::NotUnique
    }

    pub fn is_tenant_required(&self) -> bool {
        self.kind() == ErrorKind::TenantRequired
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

/// Result type alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// SQLSTATE codes classified by [`map_driver_error`].
pub mod sqlstate {
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const QUERY_CANCELED: &str = "57014";
}

/// Classifies a driver error into the repository taxonomy.
///
/// `resource` names the resource type the statement operated on and ends up
/// in the error message. Unrecognised errors are logged with their raw driver
/// message and surfaced as an opaque internal error.
pub fn map_driver_error(err: DriverError, resource: &str) -> RepoError {
    match err.kind {
        DriverErrorKind::NoRows => return RepoError::not_found(resource),
        DriverErrorKind::Cancelled => return timeout_error(&err),
        DriverErrorKind::Other => {}
    }

    match err.code.as_deref() {
        Some(sqlstate::UNIQUE_VIOLATION) => RepoError::NotUnique {
            resource: resource.to_string(),
            constraint: err.constraint,
        },
        Some(sqlstate::NOT_NULL_VIOLATION) => RepoError::NotNullViolation {
            resource: resource.to_string(),
            column: err.column,
        },
        Some(sqlstate::CHECK_VIOLATION) => RepoError::CheckViolation {
            resource: resource.to_string(),
            constraint: err.constraint,
        },
        Some(sqlstate::FOREIGN_KEY_VIOLATION) => RepoError::InvalidOperation {
            message: format!(
                "{} is referenced by another record or references a missing one",
                resource
            ),
        },
        Some(sqlstate::QUERY_CANCELED) => timeout_error(&err),
        _ => {
            tracing::error!(
                "Unexpected SQL error on {} (SQLSTATE {}): {}",
                resource,
                err.code.as_deref().unwrap_or("none"),
                err.message
            );
            RepoError::Internal {
                message: "unexpected error while executing SQL query".to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

fn timeout_error(err: &DriverError) -> RepoError {
    tracing::warn!("SQL statement cancelled: {}", err.message);
    RepoError::internal("maximum processing timeout reached")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RepoError::not_found("application").to_string(), "application not found");
        assert_eq!(RepoError::TenantRequired.to_string(), "tenant is required");
        assert_eq!(
            RepoError::unauthorized("delete matched 0 rows").to_string(),
            "owner access is needed for resource modification: delete matched 0 rows"
        );
    }

    #[test]
    fn test_context_preserves_kind() {
        let err = RepoError::NotUnique {
            resource: "bundle".to_string(),
            constraint: Some("bundles_name_key".to_string()),
        }
        .context("while creating bundle with id b-1");

        assert_eq!(err.kind(), ErrorKind::NotUnique);
        assert!(err.is_not_unique());
        assert_eq!(
            err.to_string(),
            "while creating bundle with id b-1: bundle is not unique"
        );
    }

    #[test]
    fn test_map_constraint_violations() {
        let err = map_driver_error(
            DriverError::with_code(sqlstate::UNIQUE_VIOLATION, "duplicate key")
                .with_constraint("apps_name_key"),
            "application",
        );
        match err {
            RepoError::NotUnique {
                resource,
                constraint,
            } => {
                assert_eq!(resource, "application");
                assert_eq!(constraint.as_deref(), Some("apps_name_key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let cases = [
            (sqlstate::NOT_NULL_VIOLATION, ErrorKind::NotNullViolation),
            (sqlstate::CHECK_VIOLATION, ErrorKind::CheckViolation),
            (sqlstate::FOREIGN_KEY_VIOLATION, ErrorKind::InvalidOperation),
        ];
        for (code, kind) in cases {
            let err = map_driver_error(DriverError::with_code(code, "violation"), "bundle");
            assert_eq!(err.kind(), kind, "code {}", code);
        }
    }

    #[test]
    fn test_map_no_rows_and_timeouts() {
        let err = map_driver_error(DriverError::no_rows(), "webhook");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "webhook not found");

        let cancelled = map_driver_error(DriverError::cancelled("canceling statement"), "webhook");
        assert!(cancelled.is_internal());
        assert!(cancelled.to_string().contains("maximum processing timeout reached"));

        let by_code = map_driver_error(
            DriverError::with_code(sqlstate::QUERY_CANCELED, "canceling statement"),
            "webhook",
        );
        assert!(by_code.to_string().contains("maximum processing timeout reached"));
    }

    #[test]
    fn test_map_unknown_error_hides_driver_message() {
        let err = map_driver_error(
            DriverError::with_code("42P01", "relation \"secrets\" does not exist"),
            "label",
        );
        assert!(err.is_internal());
        assert_eq!(
            err.to_string(),
            "internal server error: unexpected error while executing SQL query"
        );
        assert!(!err.to_string().contains("secrets"));

        let no_code = map_driver_error(DriverError::other("connection reset"), "label");
        assert!(no_code.is_internal());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::TenantRequired.to_string(), "tenant-required");
        assert_eq!(ErrorKind::Internal.to_string(), "internal");
    }
}
