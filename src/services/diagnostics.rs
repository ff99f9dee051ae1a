use crate::db::Database;
use crate::models::user::UserRole;
use crate::services::auth_service::{AuthService, LoginRequest};
use crate::services::credentials::token_preview;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

pub const TOKEN_PREVIEW_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoginProbe {
    Success {
        user_id: i64,
        email: String,
        name: String,
        role: UserRole,
        token_prefix: String,
    },
    InvalidCredentials,
    Failed(String),
}

/// Exercise the login path end to end. Never returns an error: unexpected
/// failures are folded into [`LoginProbe::Failed`].
pub async fn probe_login(auth: &AuthService, email: &str, password: &str) -> LoginProbe {
    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };

    match auth.login(request).await {
        Ok(Some(response)) => {
            info!(user_id = response.user.id, "Login probe succeeded");
            LoginProbe::Success {
                user_id: response.user.id,
                email: response.user.email,
                name: response.user.name,
                role: response.user.role,
                token_prefix: token_preview(&response.token, TOKEN_PREVIEW_LEN),
            }
        }
        Ok(None) => {
            info!(email, "Login probe rejected");
            LoginProbe::InvalidCredentials
        }
        Err(e) => {
            warn!(email, error = %e, "Login probe failed");
            LoginProbe::Failed(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Object,
    Number,
    String,
    Bool,
    Array,
    Null,
    Missing,
}

impl JsonKind {
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None => JsonKind::Missing,
            Some(Value::Object(_)) => JsonKind::Object,
            Some(Value::Number(_)) => JsonKind::Number,
            Some(Value::String(_)) => JsonKind::String,
            Some(Value::Bool(_)) => JsonKind::Bool,
            Some(Value::Array(_)) => JsonKind::Array,
            Some(Value::Null) => JsonKind::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeCheck {
    pub path: &'static str,
    pub expected: JsonKind,
    pub actual: JsonKind,
}

impl ShapeCheck {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsProbe {
    pub stats: Value,
    pub checks: Vec<ShapeCheck>,
}

impl StatsProbe {
    pub fn failures(&self) -> impl Iterator<Item = &ShapeCheck> {
        self.checks.iter().filter(|check| !check.passed())
    }

    pub fn all_passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub const STATS_SHAPE: &[(&str, JsonKind)] = &[
    ("pool", JsonKind::Object),
    ("pool.size", JsonKind::Number),
    ("pool.idle", JsonKind::Number),
    ("pool.max_connections", JsonKind::Number),
    ("config", JsonKind::Object),
    ("config.database", JsonKind::String),
    ("config.max_connections", JsonKind::Number),
    ("config.acquire_timeout_secs", JsonKind::Number),
    ("config.slow_query_threshold_ms", JsonKind::Number),
    ("performance", JsonKind::Object),
    ("performance.total_queries", JsonKind::Number),
    ("performance.failed_queries", JsonKind::Number),
    ("performance.slow_queries", JsonKind::Number),
    ("performance.average_query_ms", JsonKind::Number),
];

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// Compare a JSON document against an expected shape. Every check is logged;
/// mismatches are returned, not raised.
pub fn check_shape(value: &Value, shape: &[(&'static str, JsonKind)]) -> Vec<ShapeCheck> {
    shape
        .iter()
        .map(|&(path, expected)| {
            let check = ShapeCheck {
                path,
                expected,
                actual: JsonKind::of(lookup(value, path)),
            };
            if check.passed() {
                info!(path, "Shape check passed");
            } else {
                warn!(
                    path,
                    expected = ?check.expected,
                    actual = ?check.actual,
                    "Shape check failed"
                );
            }
            check
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stats serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn stats_value<T: Serialize>(stats: &T) -> Result<Value, DiagnosticsError> {
    Ok(serde_json::to_value(stats)?)
}

/// Ping the store, snapshot its stats and check their shape. Shape
/// mismatches are reported in the result, never as `Err`.
pub async fn probe_stats(db: &Database) -> Result<StatsProbe, DiagnosticsError> {
    db.ping().await?;

    let stats = stats_value(&db.stats())?;
    let checks = check_shape(&stats, STATS_SHAPE);

    Ok(StatsProbe { stats, checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use serde_json::json;

    #[test]
    fn test_check_shape_reports_mismatches() {
        let value = json!({
            "pool": { "size": 1, "idle": "one" },
            "config": 5,
        });
        let shape = &[
            ("pool", JsonKind::Object),
            ("pool.size", JsonKind::Number),
            ("pool.idle", JsonKind::Number),
            ("config.max_connections", JsonKind::Number),
        ];

        let checks = check_shape(&value, shape);
        let failed: Vec<_> = checks.iter().filter(|c| !c.passed()).map(|c| c.path).collect();
        assert_eq!(failed, vec!["pool.idle", "config.max_connections"]);
        assert_eq!(checks[2].actual, JsonKind::String);
        assert_eq!(checks[3].actual, JsonKind::Missing);
    }

    #[test]
    fn test_unserializable_stats_are_an_error() {
        let mut stats = std::collections::HashMap::new();
        stats.insert((1, 2), 3);

        let result = stats_value(&stats);
        assert!(matches!(result, Err(DiagnosticsError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_probe_stats_shape_is_complete() {
        let db = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();

        let probe = probe_stats(&db).await.unwrap();
        assert!(probe.all_passed(), "failures: {:?}", probe.failures().collect::<Vec<_>>());
        assert_eq!(probe.checks.len(), STATS_SHAPE.len());
        assert!(probe.stats["performance"]["total_queries"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_probe_stats_fails_on_closed_store() {
        let db = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        db.close().await;

        assert!(matches!(
            probe_stats(&db).await,
            Err(DiagnosticsError::Database(_))
        ));
    }
}
