use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    /// Postgres connection string; when absent rules live in memory
    pub database_url: Option<String>,
    /// JSON file mirroring the in-memory store
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            snapshot_path: env::var("WORKFLOW_SNAPSHOT_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match (&self.database_url, &self.snapshot_path) {
            (Some(url), _) => StorageBackend::Postgres(url.clone()),
            (None, Some(path)) => StorageBackend::SnapshotFile(path.clone()),
            (None, None) => StorageBackend::Memory,
        }
    }
}

/// Where workflow rules are persisted
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Memory,
    SnapshotFile(PathBuf),
    Postgres(String),
}
