//! Per-repository tenant scoping.

use super::{AccessLevel, ResourceType, Tenancy, TenantId};
use crate::config::RepoConfig;
use crate::error::RepoResult;
use crate::query::{Condition, Filter};

/// Everything a tenant-scoped repository needs to isolate rows: the resource
/// type, how it is tenanted, and the configured table and column names.
///
/// # Examples
///
/// ```
/// use tenant_persistence::tenant::{ResourceType, Tenancy, TenantScope};
///
/// let users = TenantScope::new(ResourceType::new("user", "users"))
///     .with_tenancy(Tenancy::embedded("tenant_id"));
/// assert_eq!(users.resource().table(), "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    resource: ResourceType,
    tenancy: Tenancy,
    config: RepoConfig,
}

impl TenantScope {
    /// Scopes `resource` through its tenant-access table with the default configuration.
    pub fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            tenancy: Tenancy::AccessTable,
            config: RepoConfig::default(),
        }
    }

    /// Sets the tenancy mode.
    pub fn with_tenancy(mut self, tenancy: Tenancy) -> Self {
        self.tenancy = tenancy;
        self
    }

    /// Sets the table and column configuration.
    pub fn with_config(mut self, config: RepoConfig) -> Self {
        self.config = config;
        self
    }

    /// The scoped resource type.
    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    /// The tenancy mode.
    pub fn tenancy(&self) -> &Tenancy {
        &self.tenancy
    }

    /// The table and column configuration.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// The table rows live in.
    pub fn table(&self) -> &str {
        self.resource.table()
    }

    /// Builds the isolation predicate for `tenant`.
    pub fn predicate(&self, tenant: &TenantId, level: AccessLevel) -> RepoResult<Condition> {
        self.tenancy
            .predicate(&self.config, &self.resource, tenant, level)
    }

    /// Returns `filter` with the isolation predicate for `tenant` evaluated first.
    pub fn restrict(
        &self,
        tenant: &TenantId,
        filter: Filter,
        level: AccessLevel,
    ) -> RepoResult<Filter> {
        Ok(filter.with_leading(self.predicate(tenant, level)?))
    }
}
