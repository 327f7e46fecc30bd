//! Records and scopes shared by the repository tests.
//!
//! - `User`: embedded tenancy on `users.tenant_id`, versioned
//! - `App`: top-level resource with the `tenant_applications` access table
//! - `Bundle`: child of `App` with the `tenant_bundles` access table

use tenant_persistence::query::{Row, SqlValue};
use tenant_persistence::repo::{Entity, FromRow};
use tenant_persistence::tenant::{ParentRef, ResourceType, Tenancy, TenantScope};
use tenant_persistence::RepoResult;

pub const TENANT: &str = "T1";
pub const OTHER_TENANT: &str = "T2";

pub const USER_COLUMNS: [&str; 6] = ["id", "tenant_id", "first_name", "last_name", "age", "version"];
pub const APP_COLUMNS: [&str; 3] = ["id", "name", "description"];
pub const BUNDLE_COLUMNS: [&str; 3] = ["id", "app_id", "name"];

/// The recursive ancestor CTE over the default tenant table, `$1` bound.
pub const PARENTS_CTE: &str = "WITH RECURSIVE parents AS (SELECT t1.id, t1.parent FROM business_tenant_mappings t1 WHERE id = $1 UNION ALL SELECT t2.id, t2.parent FROM business_tenant_mappings t2 INNER JOIN parents t ON t2.id = t.parent)";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub version: i64,
}

impl User {
    pub fn new(id: &str, tenant_id: &str, first_name: &str, last_name: &str, age: i64) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
            version: 1,
        }
    }

    pub fn row(&self) -> Row {
        Row::from_pairs([
            ("id", SqlValue::text(self.id.as_str())),
            ("tenant_id", SqlValue::text(self.tenant_id.as_str())),
            ("first_name", SqlValue::text(self.first_name.as_str())),
            ("last_name", SqlValue::text(self.last_name.as_str())),
            ("age", SqlValue::Integer(self.age)),
            ("version", SqlValue::Integer(self.version)),
        ])
    }

    pub fn values(&self) -> Vec<SqlValue> {
        USER_COLUMNS
            .iter()
            .map(|c| self.value(c).unwrap_or(SqlValue::Null))
            .collect()
    }
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: &str) -> Option<SqlValue> {
        match column {
            "id" => Some(SqlValue::text(self.id.as_str())),
            "tenant_id" => Some(SqlValue::text(self.tenant_id.as_str())),
            "first_name" => Some(SqlValue::text(self.first_name.as_str())),
            "last_name" => Some(SqlValue::text(self.last_name.as_str())),
            "age" => Some(SqlValue::Integer(self.age)),
            "version" => Some(SqlValue::Integer(self.version)),
            _ => None,
        }
    }

    fn version(&self) -> Option<i64> {
        Some(self.version)
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            age: row.get("age")?,
            version: row.get("version")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl App {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    pub fn row(&self) -> Row {
        Row::from_pairs([
            ("id", SqlValue::text(self.id.as_str())),
            ("name", SqlValue::text(self.name.as_str())),
            ("description", SqlValue::from(self.description.clone())),
        ])
    }
}

impl Entity for App {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: &str) -> Option<SqlValue> {
        match column {
            "id" => Some(SqlValue::text(self.id.as_str())),
            "name" => Some(SqlValue::text(self.name.as_str())),
            "description" => Some(SqlValue::from(self.description.clone())),
            _ => None,
        }
    }
}

impl FromRow for App {
    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub id: String,
    pub app_id: String,
    pub name: String,
}

impl Bundle {
    pub fn new(id: &str, app_id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            app_id: app_id.to_string(),
            name: name.to_string(),
        }
    }

    pub fn row(&self) -> Row {
        Row::from_pairs([
            ("id", SqlValue::text(self.id.as_str())),
            ("app_id", SqlValue::text(self.app_id.as_str())),
            ("name", SqlValue::text(self.name.as_str())),
        ])
    }
}

impl Entity for Bundle {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: &str) -> Option<SqlValue> {
        match column {
            "id" => Some(SqlValue::text(self.id.as_str())),
            "app_id" => Some(SqlValue::text(self.app_id.as_str())),
            "name" => Some(SqlValue::text(self.name.as_str())),
            _ => None,
        }
    }

    fn parent(&self) -> Option<ParentRef> {
        Some(ParentRef::new(app_type(), self.app_id.as_str()))
    }
}

impl FromRow for Bundle {
    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            app_id: row.get("app_id")?,
            name: row.get("name")?,
        })
    }
}

pub fn user_type() -> ResourceType {
    ResourceType::new("user", "users")
}

pub fn app_type() -> ResourceType {
    ResourceType::new("application", "applications")
        .with_access_table("tenant_applications")
        .top_level()
}

pub fn bundle_type() -> ResourceType {
    ResourceType::new("bundle", "bundles").with_access_table("tenant_bundles")
}

pub fn user_scope() -> TenantScope {
    TenantScope::new(user_type()).with_tenancy(Tenancy::embedded("tenant_id"))
}

pub fn app_scope() -> TenantScope {
    TenantScope::new(app_type())
}

pub fn bundle_scope() -> TenantScope {
    TenantScope::new(bundle_type())
}
