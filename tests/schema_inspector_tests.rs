use authadmin::{
    config::{AdminConfig, DatabaseConfig},
    error::AppError,
    runner::run_task,
    services::schema_inspector::{ColumnSpec, EnsureColumnOutcome, SchemaError, SchemaInspector},
    test_utils::test_helpers,
};
use tempfile::NamedTempFile;

async fn create_legacy_users(db: &authadmin::db::Database) {
    sqlx::query("DROP TABLE IF EXISTS legacy_users")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE legacy_users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE)",
    )
    .execute(db.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn test_list_tables_hides_internal_tables() {
    let db = test_helpers::create_test_db().await.unwrap();
    let inspector = SchemaInspector::new(db);

    let tables = inspector.list_tables().await.unwrap();
    assert_eq!(tables, vec!["user_sessions".to_string(), "users".to_string()]);
}

#[tokio::test]
async fn test_describe_users_table() {
    let db = test_helpers::create_test_db().await.unwrap();
    let inspector = SchemaInspector::new(db);

    let info = inspector.describe_table("users").await.unwrap();
    let names: Vec<&str> = info.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "email",
            "name",
            "password_hash",
            "auth_provider",
            "role",
            "email_verified",
            "google_id",
            "profile_picture",
            "created_at",
            "updated_at",
        ]
    );
    let id = &info.columns[0];
    assert_eq!(id.pk, 1);
    assert!(info.columns[1].notnull);

    assert!(matches!(
        inspector.describe_table("missing").await,
        Err(SchemaError::TableNotFound(_))
    ));
}

#[tokio::test]
async fn test_ensure_column_is_idempotent() {
    let db = test_helpers::create_test_db().await.unwrap();
    create_legacy_users(&db).await;
    let inspector = SchemaInspector::new(db);

    let spec = ColumnSpec::new("legacy_users", "google_id", "TEXT").unique();

    let first = inspector.ensure_column(&spec).await.unwrap();
    assert_eq!(
        first,
        EnsureColumnOutcome {
            column_added: true,
            index_created: true
        }
    );
    let schema_after_first = inspector.describe_table("legacy_users").await.unwrap();

    let second = inspector.ensure_column(&spec).await.unwrap();
    assert_eq!(
        second,
        EnsureColumnOutcome {
            column_added: false,
            index_created: false
        }
    );
    let schema_after_second = inspector.describe_table("legacy_users").await.unwrap();

    assert_eq!(
        schema_after_first.columns.len(),
        schema_after_second.columns.len()
    );
    assert!(inspector.column_exists("legacy_users", "google_id").await.unwrap());
    assert!(inspector.index_exists("idx_legacy_users_google_id").await.unwrap());
}

#[tokio::test]
async fn test_unique_index_enforced() {
    let db = test_helpers::create_test_db().await.unwrap();
    create_legacy_users(&db).await;
    let inspector = SchemaInspector::new(db.clone());

    inspector
        .ensure_column(&ColumnSpec::new("legacy_users", "google_id", "TEXT").unique())
        .await
        .unwrap();

    sqlx::query("INSERT INTO legacy_users (email, google_id) VALUES ('a@example.com', 'g-1')")
        .execute(db.pool())
        .await
        .unwrap();
    let duplicate =
        sqlx::query("INSERT INTO legacy_users (email, google_id) VALUES ('b@example.com', 'g-1')")
            .execute(db.pool())
            .await;
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn test_ensure_column_with_default() {
    let db = test_helpers::create_test_db().await.unwrap();
    create_legacy_users(&db).await;
    sqlx::query("INSERT INTO legacy_users (email) VALUES ('old@example.com')")
        .execute(db.pool())
        .await
        .unwrap();
    let inspector = SchemaInspector::new(db.clone());

    inspector
        .ensure_column(
            &ColumnSpec::new("legacy_users", "auth_provider", "TEXT").with_default("'local'"),
        )
        .await
        .unwrap();

    let provider: String =
        sqlx::query_scalar("SELECT auth_provider FROM legacy_users WHERE email = 'old@example.com'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(provider, "local");
}

#[tokio::test]
async fn test_index_step_completes_on_rerun() {
    let db = test_helpers::create_test_db().await.unwrap();
    create_legacy_users(&db).await;

    // Simulate a run that stopped after adding the column.
    sqlx::query("ALTER TABLE legacy_users ADD COLUMN profile_picture TEXT")
        .execute(db.pool())
        .await
        .unwrap();

    let inspector = SchemaInspector::new(db);
    let outcome = inspector
        .ensure_column(&ColumnSpec::new("legacy_users", "profile_picture", "TEXT"))
        .await
        .unwrap();

    assert!(!outcome.column_added);
    assert!(outcome.index_created);
}

#[tokio::test]
async fn test_ensure_column_rejects_bad_input() {
    let db = test_helpers::create_test_db().await.unwrap();
    let inspector = SchemaInspector::new(db);

    assert!(matches!(
        inspector
            .ensure_column(&ColumnSpec::new("missing_table", "x", "TEXT"))
            .await,
        Err(SchemaError::TableNotFound(_))
    ));
    assert!(matches!(
        inspector
            .ensure_column(&ColumnSpec::new("users; DROP TABLE users", "x", "TEXT"))
            .await,
        Err(SchemaError::InvalidIdentifier(_))
    ));
}

#[tokio::test]
async fn test_identity_upgrade_is_noop_on_current_schema() {
    let db = test_helpers::create_test_db().await.unwrap();
    let inspector = SchemaInspector::new(db);

    let results = inspector.upgrade_identity_columns().await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|(_, outcome)| !outcome.column_added));

    let again = inspector.upgrade_identity_columns().await.unwrap();
    assert!(again
        .iter()
        .all(|(_, outcome)| !outcome.column_added && !outcome.index_created));
}

#[tokio::test]
async fn test_schema_change_survives_reopen() {
    let (db, temp_file) = test_helpers::create_test_db_file().await.unwrap();
    create_legacy_users(&db).await;

    let spec = ColumnSpec::new("legacy_users", "google_id", "TEXT").unique();
    let first = SchemaInspector::new(db.clone())
        .ensure_column(&spec)
        .await
        .unwrap();
    assert!(first.column_added);
    db.close().await;

    let reopened = test_helpers::open_test_db_file(&temp_file).await.unwrap();
    let second = SchemaInspector::new(reopened)
        .ensure_column(&spec)
        .await
        .unwrap();
    assert!(!second.column_added);
    assert!(!second.index_created);
}

#[tokio::test]
async fn test_ensure_column_matches_names_case_insensitively() {
    let db = test_helpers::create_test_db().await.unwrap();
    let inspector = SchemaInspector::new(db);

    let existing = inspector
        .ensure_column(&ColumnSpec::new("users", "Email", "TEXT"))
        .await
        .unwrap();
    assert!(!existing.column_added);

    let mixed_table = inspector
        .ensure_column(&ColumnSpec::new("Users", "google_id", "TEXT").unique())
        .await
        .unwrap();
    assert_eq!(
        mixed_table,
        EnsureColumnOutcome {
            column_added: false,
            index_created: false
        }
    );
}

#[tokio::test]
async fn test_ensure_column_accepts_keyword_names() {
    let db = test_helpers::create_test_db().await.unwrap();
    create_legacy_users(&db).await;
    let inspector = SchemaInspector::new(db);

    let spec = ColumnSpec::new("legacy_users", "order", "INTEGER").with_default("0");
    let first = inspector.ensure_column(&spec).await.unwrap();
    assert!(first.column_added);
    assert!(first.index_created);

    assert!(inspector.column_exists("legacy_users", "order").await.unwrap());
    assert!(inspector.index_exists("idx_legacy_users_order").await.unwrap());

    let second = inspector.ensure_column(&spec).await.unwrap();
    assert!(!second.column_added && !second.index_created);
}

fn file_config(temp_file: &NamedTempFile) -> AdminConfig {
    AdminConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}", temp_file.path().display()),
            ..DatabaseConfig::in_memory()
        },
        hashing: test_helpers::test_hashing_config(),
        session_ttl_hours: 24,
        run_migrations: true,
    }
}

#[tokio::test]
async fn test_upgrade_runs_on_pre_identity_users_table() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = test_helpers::open_test_db_file(&temp_file).await.unwrap();
    sqlx::query(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT '',
            password_hash TEXT,
            role TEXT NOT NULL DEFAULT 'user',
            email_verified BOOLEAN NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();
    sqlx::query("INSERT INTO users (email, name) VALUES ('old@example.com', 'Old')")
        .execute(db.pool())
        .await
        .unwrap();
    db.close().await;

    let config = file_config(&temp_file);

    let (ledger_tables, results) = run_task(&config, "schema-upgrade", |db| async move {
        let ledger_tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = '_sqlx_migrations'",
        )
        .fetch_one(db.pool())
        .await?;
        let results = SchemaInspector::new(db).upgrade_identity_columns().await?;
        Ok::<_, AppError>((ledger_tables, results))
    })
    .await
    .unwrap();

    assert_eq!(ledger_tables, 0);
    assert_eq!(results.len(), 3);
    assert!(results
        .iter()
        .all(|(_, outcome)| outcome.column_added && outcome.index_created));

    // With the identity columns in place the bootstrap applies on the next run.
    let (sessions_table, provider) = run_task(&config, "after-upgrade", |db| async move {
        let sessions_table: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_sessions'",
        )
        .fetch_one(db.pool())
        .await?;
        let provider: String =
            sqlx::query_scalar("SELECT auth_provider FROM users WHERE email = 'old@example.com'")
                .fetch_one(db.pool())
                .await?;
        Ok::<_, AppError>((sessions_table, provider))
    })
    .await
    .unwrap();

    assert_eq!(sessions_table, 1);
    assert_eq!(provider, "local");
}
