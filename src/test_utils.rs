pub mod test_helpers {
    use crate::config::{DatabaseConfig, HashingConfig};
    use crate::db::Database;
    use crate::services::CredentialHasher;
    use crate::AdminContext;
    use tempfile::NamedTempFile;

    /// Cheap work factor so tests do not spend their time hashing.
    pub fn test_hashing_config() -> HashingConfig {
        HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub fn test_hasher() -> CredentialHasher {
        match CredentialHasher::new(&test_hashing_config()) {
            Ok(hasher) => hasher,
            Err(e) => panic!("Failed to build test hasher: {}", e),
        }
    }

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<Database, sqlx::Error> {
        let db = Database::connect(&DatabaseConfig::in_memory()).await?;

        // Run migrations
        db.migrate().await?;

        Ok(db)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when the store has to survive closing and reopening the pool
    pub async fn create_test_db_file() -> Result<(Database, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db = open_test_db_file(&temp_file).await?;

        // Run migrations
        db.migrate().await?;

        Ok((db, temp_file))
    }

    /// Open another pool on an existing temporary database file
    pub async fn open_test_db_file(temp_file: &NamedTempFile) -> Result<Database, sqlx::Error> {
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path),
            ..DatabaseConfig::in_memory()
        };

        Database::connect(&config).await
    }

    pub async fn create_test_context() -> Result<AdminContext, sqlx::Error> {
        let db = create_test_db().await?;
        Ok(AdminContext::new(db, test_hasher(), 24))
    }

    /// Insert a local test user with hashed password
    pub async fn insert_test_user(
        db: &Database,
        email: &str,
        password: &str,
        verified: bool,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = test_hasher().hash_password(password).map_err(|e| {
            sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
        })?;

        let result = sqlx::query(
            "INSERT INTO users (email, name, password_hash, email_verified) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind("Test User")
        .bind(password_hash)
        .bind(verified)
        .execute(db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a Google-linked user without a local credential
    pub async fn insert_external_user(
        db: &Database,
        email: &str,
        google_id: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, name, auth_provider, google_id, email_verified)
            VALUES (?, ?, 'google', ?, 1)
            "#,
        )
        .bind(email)
        .bind("External User")
        .bind(google_id)
        .execute(db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a session row directly, bypassing login
    pub async fn insert_test_session(
        db: &Database,
        user_id: i64,
        token_hash: &str,
        active: bool,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_sessions (user_id, token_hash, is_active, expires_at)
            VALUES (?, ?, ?, datetime('now', '+1 day'))
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(active)
        .execute(db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn fetch_password_hash(
        db: &Database,
        email: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("SELECT password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(db.pool())
            .await
    }

    pub async fn count_active_sessions(db: &Database, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_sessions WHERE user_id = ? AND is_active = 1",
        )
        .bind(user_id)
        .fetch_one(db.pool())
        .await
    }
}

// Re-export commonly used test functions at module level for convenience
// Note: This is test-only code. Panic on error is acceptable in tests.
#[cfg(test)]
pub async fn create_test_pool() -> crate::db::Database {
    match test_helpers::create_test_db().await {
        Ok(db) => db,
        Err(e) => panic!("Failed to create test pool: {}", e),
    }
}
