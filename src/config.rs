//! Environment-driven configuration with defaults.
//!
//! Every setting can be overridden through a `VECBASE_*` environment
//! variable; unset or unparsable values fall back to the defaults in
//! [`crate::constants`]. The one exception is the index type: a value that
//! names no known strategy is a startup error rather than a silent default.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_LSH_NUM_BUCKETS, DEFAULT_LSH_NUM_HASHES, DEFAULT_PERSISTENCE_PATH,
    DEFAULT_PORT,
};
use crate::models::IndexType;

#[derive(Debug, Clone)]
pub struct Settings {
    // Server
    pub host: String,
    pub port: u16,

    // Persistence
    pub persistence_path: Option<PathBuf>,

    // Indexing
    pub default_index_type: IndexType,
    pub lsh_num_hashes: usize,
    pub lsh_num_buckets: usize,

    // CORS. `["*"]` means fully permissive.
    pub cors_origins: Vec<String>,
    pub cors_methods: Vec<String>,
    pub cors_headers: Vec<String>,
    pub cors_credentials: bool,

    // Logging
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub enable_file_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            persistence_path: Some(PathBuf::from(DEFAULT_PERSISTENCE_PATH)),
            default_index_type: IndexType::Linear,
            lsh_num_hashes: DEFAULT_LSH_NUM_HASHES,
            lsh_num_buckets: DEFAULT_LSH_NUM_BUCKETS,
            cors_origins: vec!["*".to_string()],
            cors_methods: vec!["*".to_string()],
            cors_headers: vec!["*".to_string()],
            cors_credentials: true,
            log_level: "info".to_string(),
            log_file: None,
            enable_file_logging: false,
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let default_index_type = match std::env::var("VECBASE_DEFAULT_INDEX_TYPE") {
            Ok(raw) => raw
                .parse::<IndexType>()
                .with_context(|| format!("VECBASE_DEFAULT_INDEX_TYPE={}", raw))?,
            Err(_) => defaults.default_index_type,
        };

        Ok(Self {
            host: env_or("VECBASE_HOST", defaults.host),
            port: env_or("VECBASE_PORT", defaults.port),
            persistence_path: Some(PathBuf::from(env_or(
                "VECBASE_PERSISTENCE_PATH",
                DEFAULT_PERSISTENCE_PATH.to_string(),
            ))),
            default_index_type,
            lsh_num_hashes: env_or("VECBASE_LSH_NUM_HASHES", defaults.lsh_num_hashes),
            lsh_num_buckets: env_or("VECBASE_LSH_NUM_BUCKETS", defaults.lsh_num_buckets),
            cors_origins: env_list("VECBASE_CORS_ORIGINS", defaults.cors_origins),
            cors_methods: env_list("VECBASE_CORS_METHODS", defaults.cors_methods),
            cors_headers: env_list("VECBASE_CORS_HEADERS", defaults.cors_headers),
            cors_credentials: env_or("VECBASE_CORS_CREDENTIALS", defaults.cors_credentials),
            log_level: env_or("VECBASE_LOG_LEVEL", defaults.log_level),
            log_file: std::env::var("VECBASE_LOG_FILE").ok().map(PathBuf::from),
            enable_file_logging: env_or("VECBASE_ENABLE_FILE_LOGGING", false),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

/// Comma-separated list variable, e.g. `VECBASE_CORS_ORIGINS=a.com,b.com`.
fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 8000);
        assert_eq!(
            settings.persistence_path,
            Some(PathBuf::from("data/vector_db.json"))
        );
        assert_eq!(settings.default_index_type, IndexType::Linear);
        assert_eq!(settings.lsh_num_hashes, 10);
        assert_eq!(settings.lsh_num_buckets, 100);
        assert_eq!(settings.cors_origins, vec!["*".to_string()]);
        assert_eq!(settings.log_level, "info");
        assert!(!settings.enable_file_logging);
    }
}
