//! Resource type descriptors.

use std::fmt;

use crate::error::{RepoError, RepoResult};

/// Describes how a kind of record is stored and guarded.
///
/// A *top-level* resource owns its tenant-access rows: creating or upserting
/// it writes one access row per tenant in the creator's ancestor chain. A
/// *child* resource (for example an API definition below an application)
/// derives visibility from its parent, typically through a view, and never
/// writes access rows of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceType {
    name: String,
    table: String,
    access_table: Option<String>,
    top_level: bool,
}

impl ResourceType {
    /// Creates a child resource type stored in `table`, without an access table.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            access_table: None,
            top_level: false,
        }
    }

    /// Sets the tenant-access table (or view) that guards rows of this type.
    pub fn with_access_table(mut self, access_table: impl Into<String>) -> Self {
        self.access_table = Some(access_table.into());
        self
    }

    /// Marks the type as top-level.
    pub fn top_level(mut self) -> Self {
        self.top_level = true;
        self
    }

    /// The name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table rows of this type live in.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The tenant-access table, if one is configured.
    pub fn access_table(&self) -> Option<&str> {
        self.access_table.as_deref()
    }

    /// The tenant-access table, or an internal error naming the type.
    pub fn require_access_table(&self) -> RepoResult<&str> {
        self.access_table().ok_or_else(|| {
            RepoError::internal(format!(
                "resource type {} has no tenant access table",
                self.name
            ))
        })
    }

    /// Returns `true` for top-level resource types.
    pub fn is_top_level(&self) -> bool {
        self.top_level
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A reference from a child record to the record that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Type of the parent record.
    pub resource_type: ResourceType,
    /// Id of the parent record.
    pub id: String,
}

impl ParentRef {
    /// Creates a parent reference.
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }
}
