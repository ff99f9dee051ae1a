use crate::config::DatabaseConfig;
use serde::{Deserialize, Serialize};
use sqlx::{migrate::Migrator, sqlite::SqlitePoolOptions, SqlitePool};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the data directory exists
    if let Some(path) = config.sqlite_path() {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let mut options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

    // An in-memory database lives exactly as long as its connection.
    if config.sqlite_path().is_none() {
        options = options.idle_timeout(None).max_lifetime(None);
    }

    options.connect(&config.url).await
}

#[derive(Debug, Default)]
struct QueryMetrics {
    total: AtomicU64,
    failed: AtomicU64,
    slow: AtomicU64,
    total_micros: AtomicU64,
}

/// Scoped handle to the store. Acquired once per task and closed by the
/// runner on every exit path.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
    config: DatabaseConfig,
    metrics: Arc<QueryMetrics>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = create_pool(config).await?;
        Ok(Self::from_pool(pool, config.clone()))
    }

    pub fn from_pool(pool: SqlitePool, config: DatabaseConfig) -> Self {
        Self {
            pool,
            config,
            metrics: Arc::new(QueryMetrics::default()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    /// Apply the bootstrap migrations unless the store holds a `users` table
    /// that predates the identity columns. The bootstrap indexes those
    /// columns, so such a table has to go through `schema upgrade` first.
    /// Returns whether the migrations ran.
    pub async fn bootstrap(&self) -> Result<bool, sqlx::migrate::MigrateError> {
        let (has_users, identity_columns) = self
            .timed(
                sqlx::query_as::<_, (bool, i64)>(
                    r#"
                    SELECT
                        EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users'),
                        (SELECT COUNT(*) FROM pragma_table_info('users')
                         WHERE name IN ('google_id', 'auth_provider', 'profile_picture'))
                    "#,
                )
                .fetch_one(&self.pool),
            )
            .await?;

        if has_users && identity_columns < 3 {
            tracing::warn!(
                identity_columns,
                "users table lacks identity columns, skipping migrations until `schema upgrade`"
            );
            return Ok(false);
        }

        self.migrate().await?;
        Ok(true)
    }

    /// Run one store operation and record its latency and outcome.
    pub async fn timed<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = operation.await;
        let elapsed = started.elapsed();

        self.metrics.total.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        if result.is_err() {
            self.metrics.failed.fetch_add(1, Ordering::Relaxed);
        }
        if elapsed.as_millis() as u64 >= self.config.slow_query_threshold_ms {
            self.metrics.slow.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Slow query");
        }

        result
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.timed(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }

    pub fn stats(&self) -> DatabaseStats {
        let total = self.metrics.total.load(Ordering::Relaxed);
        let total_micros = self.metrics.total_micros.load(Ordering::Relaxed);
        let average_query_ms = if total == 0 {
            0.0
        } else {
            total_micros as f64 / total as f64 / 1000.0
        };

        DatabaseStats {
            pool: PoolStats {
                size: self.pool.size(),
                idle: self.pool.num_idle() as u32,
                max_connections: self.config.max_connections,
            },
            config: ConfigStats {
                database: self.config.redacted_url(),
                max_connections: self.config.max_connections,
                acquire_timeout_secs: self.config.acquire_timeout_secs,
                slow_query_threshold_ms: self.config.slow_query_threshold_ms,
            },
            performance: PerformanceStats {
                total_queries: total,
                failed_queries: self.metrics.failed.load(Ordering::Relaxed),
                slow_queries: self.metrics.slow.load(Ordering::Relaxed),
                average_query_ms,
            },
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub pool: PoolStats,
    pub config: ConfigStats,
    pub performance: PerformanceStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigStats {
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub average_query_ms: f64,
}
