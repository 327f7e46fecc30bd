//! Repository configuration.
//!
//! The names of the tenant hierarchy table and of the tenant-access columns
//! are configuration, passed explicitly to every tenant-aware repository.

use serde::{Deserialize, Serialize};

use crate::error::RepoResult;
use crate::query::validate_identifier;

/// Table and column names used for tenant isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Table holding one row per tenant with a parent edge.
    #[serde(default = "default_tenant_table")]
    pub tenant_table: String,

    /// Tenant id column of the hierarchy table.
    #[serde(default = "default_tenant_id_column")]
    pub tenant_id_column: String,

    /// Parent tenant column of the hierarchy table.
    #[serde(default = "default_tenant_parent_column")]
    pub tenant_parent_column: String,

    /// Tenant column of every tenant-access table.
    #[serde(default = "default_access_tenant_column")]
    pub access_tenant_column: String,

    /// Resource id column of every tenant-access table.
    #[serde(default = "default_access_resource_column")]
    pub access_resource_column: String,

    /// Owner flag column of every tenant-access table.
    #[serde(default = "default_access_owner_column")]
    pub access_owner_column: String,
}

fn default_tenant_table() -> String {
    "business_tenant_mappings".to_string()
}

fn default_tenant_id_column() -> String {
    "id".to_string()
}

fn default_tenant_parent_column() -> String {
    "parent".to_string()
}

fn default_access_tenant_column() -> String {
    "tenant_id".to_string()
}

fn default_access_resource_column() -> String {
    "id".to_string()
}

fn default_access_owner_column() -> String {
    "owner".to_string()
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            tenant_table: default_tenant_table(),
            tenant_id_column: default_tenant_id_column(),
            tenant_parent_column: default_tenant_parent_column(),
            access_tenant_column: default_access_tenant_column(),
            access_resource_column: default_access_resource_column(),
            access_owner_column: default_access_owner_column(),
        }
    }
}

impl RepoConfig {
    /// Checks that every configured name is a valid SQL identifier.
    pub fn validate(&self) -> RepoResult<()> {
        for name in [
            &self.tenant_table,
            &self.tenant_id_column,
            &self.tenant_parent_column,
            &self.access_tenant_column,
            &self.access_resource_column,
            &self.access_owner_column,
        ] {
            validate_identifier(name)?;
        }
        Ok(())
    }

    /// Returns the tenant-access columns in insertion order: tenant, resource, owner.
    pub fn access_columns(&self) -> [&str; 3] {
        [
            &self.access_tenant_column,
            &self.access_resource_column,
            &self.access_owner_column,
        ]
    }
}
