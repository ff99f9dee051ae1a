use crate::config::AdminConfig;
use crate::db::Database;
use crate::error::Result;
use std::future::Future;
use tracing::{error, info};

/// Run one admin task against the store.
///
/// Opens the store, bootstraps the schema when configured, runs
/// `task` and closes the pool whatever the task returned. The task's result
/// is handed back untouched so the caller can map it to an exit code.
pub async fn run_task<T, F, Fut>(config: &AdminConfig, name: &str, task: F) -> Result<T>
where
    F: FnOnce(Database) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    info!(task = name, database = %config.database.redacted_url(), "Starting task");
    let db = Database::connect(&config.database).await?;

    let result = async {
        if config.run_migrations {
            db.bootstrap().await?;
        }
        task(db.clone()).await
    }
    .await;

    db.close().await;

    match &result {
        Ok(_) => info!(task = name, "Task finished"),
        Err(e) => error!(task = name, error = %e, "Task failed"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, HashingConfig};
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    fn config() -> AdminConfig {
        AdminConfig {
            database: DatabaseConfig::in_memory(),
            hashing: HashingConfig::default(),
            session_ttl_hours: 24,
            run_migrations: true,
        }
    }

    #[tokio::test]
    async fn test_store_closed_after_success() {
        let seen: Arc<Mutex<Option<Database>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();

        let tables = run_task(&config(), "count-tables", |db| async move {
            *captured.lock().unwrap() = Some(db.clone());
            let count = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
            )
            .fetch_one(db.pool())
            .await?;
            Ok::<_, AppError>(count)
        })
        .await
        .unwrap();

        assert_eq!(tables, 1);
        let db = seen.lock().unwrap().take().unwrap();
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn test_store_closed_after_failure() {
        let seen: Arc<Mutex<Option<Database>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();

        let result: Result<()> = run_task(&config(), "failing", |db| async move {
            *captured.lock().unwrap() = Some(db);
            Err(AppError::Input("boom".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Input(_))));
        let db = seen.lock().unwrap().take().unwrap();
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.database.url = format!("sqlite://{}", dir.path().join("missing.db").display());

        let result: Result<()> = run_task(&config, "noop", |_| async { Ok(()) }).await;
        assert!(result.is_err());
    }
}
