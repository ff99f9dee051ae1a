use crate::db::Database;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::FromRow;
use tracing::{debug, info};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));
static SQL_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z ]{0,30}(\(\s*\d+\s*(,\s*\d+\s*)?\))?$").expect("valid regex")
});
static DEFAULT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^('[^']*'|-?\d+(\.\d+)?|NULL|TRUE|FALSE)$").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid column type: {0}")]
    InvalidType(String),
    #[error("Invalid default value: {0}")]
    InvalidDefault(String),
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// An additive column change plus its supporting index.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub table: String,
    pub column: String,
    pub sql_type: String,
    pub unique: bool,
    /// SQL literal used as the column default, e.g. `'local'` or `0`.
    pub default: Option<String>,
}

impl ColumnSpec {
    pub fn new(table: &str, column: &str, sql_type: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            sql_type: sql_type.to_string(),
            unique: false,
            default: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, literal: &str) -> Self {
        self.default = Some(literal.to_string());
        self
    }

    pub fn index_name(&self) -> String {
        format!("idx_{}_{}", self.table, self.column)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        validate_identifier(&self.table)?;
        validate_identifier(&self.column)?;
        if !SQL_TYPE.is_match(&self.sql_type) {
            return Err(SchemaError::InvalidType(self.sql_type.clone()));
        }
        if let Some(ref literal) = self.default {
            if !DEFAULT_LITERAL.is_match(literal) {
                return Err(SchemaError::InvalidDefault(literal.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnsureColumnOutcome {
    pub column_added: bool,
    pub index_created: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[sqlx(rename = "type")]
    pub sql_type: String,
    pub notnull: bool,
    pub pk: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Identity columns the login flow relies on.
pub fn identity_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("users", "google_id", "TEXT").unique(),
        ColumnSpec::new("users", "auth_provider", "TEXT").with_default("'local'"),
        ColumnSpec::new("users", "profile_picture", "TEXT"),
    ]
}

fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// Identifiers are validated first, so they never contain a quote.
fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Reads the catalog and applies idempotent, additive DDL.
///
/// SQLite compares table and column names case-insensitively, and so do the
/// catalog lookups here.
pub struct SchemaInspector {
    db: Database,
}

impl SchemaInspector {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        let tables = self
            .db
            .timed(
                sqlx::query_scalar::<_, String>(
                    r#"
                    SELECT name FROM sqlite_master
                    WHERE type = 'table'
                      AND name NOT LIKE 'sqlite_%'
                      AND name != '_sqlx_migrations'
                    ORDER BY name
                    "#,
                )
                .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(tables)
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, SchemaError> {
        let count = self
            .db
            .timed(
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM sqlite_master
                    WHERE type = 'table' AND name = ? COLLATE NOCASE
                    "#,
                )
                .bind(table)
                .fetch_one(self.db.pool()),
            )
            .await?;

        Ok(count > 0)
    }

    pub async fn describe_table(&self, table: &str) -> Result<TableInfo, SchemaError> {
        validate_identifier(table)?;
        if !self.table_exists(table).await? {
            return Err(SchemaError::TableNotFound(table.to_string()));
        }

        let columns = self
            .db
            .timed(
                sqlx::query_as::<_, ColumnInfo>(
                    "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?) ORDER BY cid",
                )
                .bind(table)
                .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(TableInfo {
            name: table.to_string(),
            columns,
        })
    }

    pub async fn describe_all(&self) -> Result<Vec<TableInfo>, SchemaError> {
        let mut tables = Vec::new();
        for name in self.list_tables().await? {
            tables.push(self.describe_table(&name).await?);
        }
        Ok(tables)
    }

    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool, SchemaError> {
        let count = self
            .db
            .timed(
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ? COLLATE NOCASE",
                )
                .bind(table)
                .bind(column)
                .fetch_one(self.db.pool()),
            )
            .await?;

        Ok(count > 0)
    }

    pub async fn index_exists(&self, name: &str) -> Result<bool, SchemaError> {
        let count = self
            .db
            .timed(
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM sqlite_master
                    WHERE type = 'index' AND name = ? COLLATE NOCASE
                    "#,
                )
                .bind(name)
                .fetch_one(self.db.pool()),
            )
            .await?;

        Ok(count > 0)
    }

    /// Add the column if the catalog lacks it, then make sure its index
    /// exists. Each step checks before acting, so a rerun after a partial
    /// failure completes the change.
    pub async fn ensure_column(
        &self,
        spec: &ColumnSpec,
    ) -> Result<EnsureColumnOutcome, SchemaError> {
        spec.validate()?;

        if !self.table_exists(&spec.table).await? {
            return Err(SchemaError::TableNotFound(spec.table.clone()));
        }

        let column_added = if self.column_exists(&spec.table, &spec.column).await? {
            debug!(table = %spec.table, column = %spec.column, "Column already present");
            false
        } else {
            let mut ddl = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_identifier(&spec.table),
                quote_identifier(&spec.column),
                spec.sql_type
            );
            if let Some(ref literal) = spec.default {
                ddl.push_str(" DEFAULT ");
                ddl.push_str(literal);
            }
            debug!(%ddl, "Adding column");
            self.db
                .timed(sqlx::query(&ddl).execute(self.db.pool()))
                .await?;
            info!(table = %spec.table, column = %spec.column, "Column added");
            true
        };

        let index_name = spec.index_name();
        let index_created = if self.index_exists(&index_name).await? {
            false
        } else {
            let ddl = format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {}({})",
                if spec.unique { "UNIQUE " } else { "" },
                quote_identifier(&index_name),
                quote_identifier(&spec.table),
                quote_identifier(&spec.column)
            );
            debug!(%ddl, "Creating index");
            self.db
                .timed(sqlx::query(&ddl).execute(self.db.pool()))
                .await?;
            info!(index = %index_name, "Index created");
            true
        };

        Ok(EnsureColumnOutcome {
            column_added,
            index_created,
        })
    }

    pub async fn upgrade_identity_columns(
        &self,
    ) -> Result<Vec<(ColumnSpec, EnsureColumnOutcome)>, SchemaError> {
        let mut results = Vec::new();
        for spec in identity_columns() {
            let outcome = self.ensure_column(&spec).await?;
            results.push((spec, outcome));
        }
        Ok(results)
    }
}
