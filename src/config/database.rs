#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_query_threshold_ms: u64,
}

impl DatabaseConfig {
    /// Settings for a throwaway in-memory store. A single connection keeps
    /// every query on the same database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 30,
            slow_query_threshold_ms: 250,
        }
    }

    /// The connection URL with any `user:password@` section masked.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        match rest.rsplit_once('@') {
            Some((_, host)) => format!("{}://***@{}", scheme, host),
            None => self.url.clone(),
        }
    }

    /// Filesystem path of a file-backed SQLite URL, if any.
    pub fn sqlite_path(&self) -> Option<&str> {
        let path = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.starts_with(":memory:") {
            None
        } else {
            Some(path)
        }
    }
}
