//! PostgreSQL backend tests.
//!
//! Configuration and statement-level tests run without a database. The
//! integration tests start a PostgreSQL container through testcontainers and
//! are ignored by default.
//!
//! Run with: `cargo test -p tenant-persistence --features postgres -- --include-ignored postgres`

#![cfg(feature = "postgres")]

mod common;

use common::*;

use tenant_persistence::backends::postgres::{
    PostgresConfig, PostgresSslMode, try_advisory_xact_lock,
};
use tenant_persistence::query::{Row, SqlValue};
use tenant_persistence::DriverError;

// ============================================================================
// Backend Configuration Tests (no PostgreSQL instance required)
// ============================================================================

#[test]
fn test_postgres_config_defaults() {
    let config = PostgresConfig::default();
    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, 5432);
    assert_eq!(config.dbname, "tenants");
    assert_eq!(config.user, "tenants");
    assert!(config.password.is_none());
    assert_eq!(config.ssl_mode, PostgresSslMode::Prefer);
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.connect_timeout_secs, 5);
    assert_eq!(config.statement_timeout_ms, 30000);
}

#[test]
fn test_postgres_config_serialization() {
    let config = PostgresConfig {
        host: "pg-server".to_string(),
        port: 5433,
        dbname: "test_db".to_string(),
        user: "test_user".to_string(),
        password: Some("secret".to_string()),
        ssl_mode: PostgresSslMode::Require,
        ..Default::default()
    };

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"ssl_mode\":\"require\""));

    let deserialized: PostgresConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.host, "pg-server");
    assert_eq!(deserialized.port, 5433);
    assert_eq!(deserialized.password, Some("secret".to_string()));
    assert_eq!(deserialized.ssl_mode, PostgresSslMode::Require);
}

#[test]
fn test_postgres_config_from_connection_string() {
    let config = PostgresConfig::from_connection_string("postgresql://app:pw@db.internal:6543/orgs");
    assert_eq!(config.user, "app");
    assert_eq!(config.password.as_deref(), Some("pw"));
    assert_eq!(config.host, "db.internal");
    assert_eq!(config.port, 6543);
    assert_eq!(config.dbname, "orgs");

    let partial = PostgresConfig::from_connection_string("postgres://db.internal");
    assert_eq!(partial.host, "db.internal");
    assert_eq!(partial.port, 5432);
    assert_eq!(partial.dbname, "tenants");
}

// ============================================================================
// Advisory Lock Tests (scripted database)
// ============================================================================

fn lock_row(acquired: bool) -> Row {
    Row::from_pairs([("pg_try_advisory_xact_lock", SqlValue::Bool(acquired))])
}

#[tokio::test]
async fn test_advisory_lock_acquired() {
    let db = MockDatabase::new();
    db.expect_query(
        "SELECT pg_try_advisory_xact_lock($1)",
        vec![SqlValue::Integer(42)],
        vec![lock_row(true)],
    );

    assert!(try_advisory_xact_lock(&db, 42).await.unwrap());
    db.assert_done();
}

#[tokio::test]
async fn test_advisory_lock_held_elsewhere() {
    let db = MockDatabase::new();
    db.expect_query(
        "SELECT pg_try_advisory_xact_lock($1)",
        vec![SqlValue::Integer(7)],
        vec![lock_row(false)],
    );

    assert!(!try_advisory_xact_lock(&db, 7).await.unwrap());
}

#[tokio::test]
async fn test_advisory_lock_driver_failure_is_internal() {
    let db = MockDatabase::new();
    db.expect_error(
        "SELECT pg_try_advisory_xact_lock($1)",
        vec![SqlValue::Integer(7)],
        DriverError::other("connection reset"),
    );

    let err = try_advisory_xact_lock(&db, 7).await.unwrap_err();
    assert!(err.is_internal());
}

// ============================================================================
// Integration Tests (requires Docker for testcontainers)
// ============================================================================

/// Integration tests against a real PostgreSQL instance.
///
/// Run with:
///   cargo test -p tenant-persistence --features postgres -- --include-ignored postgres_integration
mod postgres_integration {
    use super::common::*;

    use tenant_persistence::backends::postgres::{
        PgExecutor, PostgresBackend, PostgresConfig, try_advisory_xact_lock,
    };
    use chrono::{TimeZone, Utc};
    use tenant_persistence::Executor;
    use tenant_persistence::query::{Condition, Filter, OrderBy, SqlValue};
    use tenant_persistence::repo::{
        Creator, Deleter, ExistQuerier, PageableQuerier, SingleGetter, UnionLister, Updater,
        Upserter,
    };
    use tenant_persistence::tenant::{TenantAccess, get_tenant_access};
    use tenant_persistence::types::Page;
    use tenant_persistence::RepoConfig;

    use testcontainers::ImageExt;
    use testcontainers::runners::AsyncRunner;
    use testcontainers_modules::postgres::Postgres;
    use tokio::sync::OnceCell;

    const SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS business_tenant_mappings (
            id TEXT PRIMARY KEY,
            parent TEXT REFERENCES business_tenant_mappings (id)
        );
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            age INTEGER NOT NULL,
            version BIGINT NOT NULL,
            UNIQUE (tenant_id, first_name, last_name)
        );
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        );
        CREATE TABLE IF NOT EXISTS tenant_applications (
            tenant_id TEXT NOT NULL,
            id TEXT NOT NULL REFERENCES applications (id) ON DELETE CASCADE,
            owner BOOLEAN NOT NULL,
            PRIMARY KEY (tenant_id, id)
        );
        CREATE TABLE IF NOT EXISTS bundles (
            id TEXT PRIMARY KEY,
            app_id TEXT NOT NULL REFERENCES applications (id),
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tenant_bundles (
            tenant_id TEXT NOT NULL,
            id TEXT NOT NULL,
            owner BOOLEAN NOT NULL,
            PRIMARY KEY (tenant_id, id)
        );
        CREATE TABLE IF NOT EXISTS typed_values (
            id UUID PRIMARY KEY,
            doc JSONB,
            small INTEGER,
            flag BOOLEAN,
            created_at TIMESTAMPTZ
        );
    "#;

    /// Shared PostgreSQL container reused across all tests in this module.
    struct SharedPg {
        host: String,
        port: u16,
        /// Kept alive for the duration of the test binary; dropped at process exit.
        _container: testcontainers::ContainerAsync<Postgres>,
    }

    static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

    fn config_for(host: &str, port: u16) -> PostgresConfig {
        PostgresConfig {
            host: host.to_string(),
            port,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: Some("postgres".to_string()),
            max_connections: 5,
            ..Default::default()
        }
    }

    async fn shared_pg() -> &'static SharedPg {
        SHARED_PG
            .get_or_init(|| async {
                let run_id = std::env::var("GITHUB_RUN_ID").unwrap_or_default();
                let container = Postgres::default()
                    .with_label("github.run_id", &run_id)
                    .start()
                    .await
                    .expect("Failed to start PostgreSQL container");

                let port = container
                    .get_host_port_ipv4(5432)
                    .await
                    .expect("Failed to get host port");

                let host = container
                    .get_host()
                    .await
                    .expect("Failed to get host")
                    .to_string();

                let backend = PostgresBackend::new(config_for(&host, port))
                    .await
                    .expect("Failed to create PostgresBackend");
                let client = backend.get_client().await.expect("Failed to get client");
                client
                    .batch_execute(SCHEMA)
                    .await
                    .expect("Failed to create schema");

                SharedPg {
                    host,
                    port,
                    _container: container,
                }
            })
            .await
    }

    async fn create_backend() -> PostgresBackend {
        let pg = shared_pg().await;
        PostgresBackend::new(config_for(&pg.host, pg.port))
            .await
            .expect("Failed to create PostgresBackend")
    }

    /// Inserts a parent tenant and a child tenant with unique ids, returning
    /// `(parent, child)`, so tests sharing the database stay isolated.
    async fn create_tenant_pair(backend: &PostgresBackend) -> (String, String) {
        let parent = format!("parent_{}", uuid::Uuid::new_v4().simple());
        let child = format!("child_{}", uuid::Uuid::new_v4().simple());
        let client = backend.get_client().await.unwrap();
        client
            .execute(
                "INSERT INTO business_tenant_mappings (id, parent) VALUES ($1, NULL), ($2, $1)",
                &[&parent, &child],
            )
            .await
            .unwrap();
        (parent, child)
    }

    fn unique(prefix: &str) -> String {
        format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_health_check() {
        let backend = create_backend().await;
        backend.health_check().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_embedded_crud() {
        let backend = create_backend().await;
        let (tenant, _) = create_tenant_pair(&backend).await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let id = unique("u");
        let user = User::new(&id, &tenant, "Peter", "Griffin", 40);
        Creator::new(user_scope(), USER_COLUMNS)
            .create(&db, &tenant, &user)
            .await
            .unwrap();

        let getter = SingleGetter::new(user_scope(), USER_COLUMNS);
        let fetched: User = getter
            .get(&db, &tenant, Condition::equal("id", id.as_str()), &[])
            .await
            .unwrap();
        assert_eq!(fetched, user);

        // Another tenant sees nothing.
        let err = getter
            .get::<User>(&db, &unique("stranger"), Condition::equal("id", id.as_str()), &[])
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let mut changed = fetched.clone();
        changed.age = 41;
        Updater::new(user_scope(), ["age"], ["id"])
            .update_single_with_version(&db, &tenant, &changed)
            .await
            .unwrap();

        let updated: User = getter
            .get(&db, &tenant, Condition::equal("id", id.as_str()), &[])
            .await
            .unwrap();
        assert_eq!(updated.age, 41);
        assert_eq!(updated.version, 2);

        Deleter::new(user_scope())
            .delete_one(&db, &tenant, Condition::equal("id", id.as_str()))
            .await
            .unwrap();
        assert!(
            !ExistQuerier::new(user_scope())
                .exists(&db, &tenant, Condition::equal("id", id.as_str()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_duplicate_is_not_unique() {
        let backend = create_backend().await;
        let (tenant, _) = create_tenant_pair(&backend).await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let creator = Creator::new(user_scope(), USER_COLUMNS);
        let user = User::new(&unique("u"), &tenant, "Lois", "Griffin", 38);
        creator.create(&db, &tenant, &user).await.unwrap();

        let err = creator.create(&db, &tenant, &user).await.unwrap_err();
        assert!(err.is_not_unique());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_pages() {
        let backend = create_backend().await;
        let (tenant, _) = create_tenant_pair(&backend).await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let creator = Creator::new(user_scope(), USER_COLUMNS);
        for (i, name) in ["Chris", "Meg", "Stewie"].iter().enumerate() {
            let user = User::new(&format!("{}_{}", tenant, i), &tenant, name, "Griffin", 10 + i as i64);
            creator.create(&db, &tenant, &user).await.unwrap();
        }

        let querier = PageableQuerier::new(user_scope(), USER_COLUMNS);
        let first: Page<User> = querier
            .list(&db, &tenant, Condition::equal("last_name", "Griffin"), &[OrderBy::asc("first_name")], 2, "")
            .await
            .unwrap();
        assert_eq!(first.total_count, 3);
        assert_eq!(first.items[0].first_name, "Chris");
        let cursor = first.page_info.end_cursor.clone().unwrap();

        let second: Page<User> = querier
            .list(&db, &tenant, Condition::equal("last_name", "Griffin"), &[OrderBy::asc("first_name")], 2, &cursor)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.items[0].first_name, "Stewie");
        assert!(!second.page_info.has_next_page);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_upsert_keeps_existing_id() {
        let backend = create_backend().await;
        let (tenant, _) = create_tenant_pair(&backend).await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let original = User::new(&unique("u"), &tenant, "Brian", "Griffin", 7);
        let upserter = Upserter::new(
            user_scope(),
            USER_COLUMNS,
            ["tenant_id", "first_name", "last_name"],
            ["age"],
        );
        let first = upserter.upsert(&db, &tenant, &original).await.unwrap();
        assert_eq!(first, original.id);

        let again = User::new(&unique("u"), &tenant, "Brian", "Griffin", 8);
        let second = upserter.upsert(&db, &tenant, &again).await.unwrap();
        assert_eq!(second, original.id);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_access_table_propagation() {
        let backend = create_backend().await;
        let (parent, child) = create_tenant_pair(&backend).await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let app = App::new(&unique("a"), &unique("name"));
        Creator::new(app_scope(), APP_COLUMNS)
            .create(&db, &child, &app)
            .await
            .unwrap();

        let config = RepoConfig::default();
        for tenant in [&child, &parent] {
            let access = get_tenant_access(&db, &config, "tenant_applications", tenant, &app.id)
                .await
                .unwrap();
            assert_eq!(access, TenantAccess::new(tenant.as_str(), app.id.as_str(), true));
        }

        let visible: App = SingleGetter::new(app_scope(), APP_COLUMNS)
            .get(&db, &parent, Condition::equal("id", app.id.as_str()), &[])
            .await
            .unwrap();
        assert_eq!(visible, app);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_repeated_top_level_upsert() {
        let backend = create_backend().await;
        let (parent, child) = create_tenant_pair(&backend).await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let name = unique("name");
        let upserter = Upserter::new(app_scope(), APP_COLUMNS, ["name"], ["description"]);
        let first = upserter
            .upsert(&db, &child, &App::new(&unique("a"), &name))
            .await
            .unwrap();
        let second = upserter
            .upsert(&db, &child, &App::new(&unique("a"), &name))
            .await
            .unwrap();
        assert_eq!(first, second);

        for tenant in [&child, &parent] {
            let row = client
                .query_one(
                    "SELECT COUNT(*) FROM tenant_applications WHERE tenant_id = $1 AND id = $2",
                    &[tenant, &first],
                )
                .await
                .unwrap();
            assert_eq!(row.get::<_, i64>(0), 1, "access rows of {}", tenant);
        }
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_typed_values_roundtrip() {
        let backend = create_backend().await;
        let client = backend.get_client().await.unwrap();
        let db = PgExecutor::new(&**client);

        let id = uuid::Uuid::new_v4();
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let inserted = db
            .execute(
                "INSERT INTO typed_values (id, doc, small, flag, created_at) VALUES ($1, $2, $3, $4, $5)",
                &[
                    SqlValue::from(id),
                    SqlValue::text(r#"{"a":1}"#),
                    SqlValue::Integer(5),
                    SqlValue::Bool(true),
                    SqlValue::Timestamp(created_at),
                ],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let rows = db
            .query(
                "SELECT id, doc, small, flag, created_at FROM typed_values WHERE id = $1",
                &[SqlValue::from(id)],
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get::<String>("id").unwrap(), id.to_string());
        assert_eq!(row.get::<serde_json::Value>("doc").unwrap(), serde_json::json!({"a": 1}));
        assert_eq!(row.get::<i64>("small").unwrap(), 5);
        assert!(row.get::<bool>("flag").unwrap());
        assert_eq!(row.get::<chrono::DateTime<Utc>>("created_at").unwrap(), created_at);

        let missing = db
            .query(
                "SELECT doc FROM typed_values WHERE id = $1",
                &[SqlValue::from(uuid::Uuid::new_v4())],
            )
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_union_listing() {
        let backend = create_backend().await;
        let (tenant, _) = create_tenant_pair(&backend).await;
        let mut client = backend.get_client().await.unwrap();

        let apps = [unique("a"), unique("a")];
        {
            let tx = client.transaction().await.unwrap();
            let db = PgExecutor::new(&*tx);
            for app_id in &apps {
                Creator::new(app_scope(), APP_COLUMNS)
                    .create(&db, &tenant, &App::new(app_id, &unique("name")))
                    .await
                    .unwrap();
            }
            for i in 0..3 {
                let bundle_id = unique("b");
                tx.execute(
                    "INSERT INTO bundles (id, app_id, name) VALUES ($1, $2, $3)",
                    &[&bundle_id, &apps[0], &format!("bundle-{}", i)],
                )
                .await
                .unwrap();
                tx.execute(
                    "INSERT INTO tenant_bundles (tenant_id, id, owner) VALUES ($1, $2, true)",
                    &[&tenant, &bundle_id],
                )
                .await
                .unwrap();
            }
            tx.commit().await.unwrap();
        }

        let db = PgExecutor::new(&**client);
        let page = UnionLister::new(bundle_scope(), BUNDLE_COLUMNS)
            .list::<Bundle>(
                &db,
                &tenant,
                &apps,
                "app_id",
                2,
                "",
                &[OrderBy::asc("name")],
                Filter::none(),
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count(&apps[0]), 3);
        assert_eq!(page.total_count(&apps[1]), 0);
        assert!(page.page_info_for(&apps[0], 2).has_next_page);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn postgres_integration_advisory_lock_is_exclusive() {
        let backend = create_backend().await;
        let mut first = backend.get_client().await.unwrap();
        let mut second = backend.get_client().await.unwrap();
        let key = 7_000_001;

        let tx1 = first.transaction().await.unwrap();
        assert!(try_advisory_xact_lock(&PgExecutor::new(&*tx1), key).await.unwrap());

        let tx2 = second.transaction().await.unwrap();
        assert!(!try_advisory_xact_lock(&PgExecutor::new(&*tx2), key).await.unwrap());

        tx1.commit().await.unwrap();
        assert!(try_advisory_xact_lock(&PgExecutor::new(&*tx2), key).await.unwrap());
        tx2.rollback().await.unwrap();
    }
}
