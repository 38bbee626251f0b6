//! Process-wide agent configuration.
//!
//! Two settings only: the catalog repository base URL and the local cache
//! root. Environment variables override the built-in defaults, and frontends
//! may override either field again from their own flags.

use std::path::PathBuf;

/// Default catalog repository base URL.
pub const DEFAULT_REPOSITORY: &str = "https://packages.stager.dev/v1/";

/// Environment variable overriding the repository base URL.
pub const REPOSITORY_ENV: &str = "STAGER_REPOSITORY";

/// Environment variable overriding the cache root path.
pub const CACHE_ROOT_ENV: &str = "STAGER_CACHE_ROOT";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL the catalog manifest and package payloads are fetched from.
    pub repository_url: String,
    /// Root of the per-package/version cache directories.
    pub cache_root: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            repository_url: DEFAULT_REPOSITORY.to_string(),
            cache_root: default_cache_root(),
        }
    }
}

impl AgentConfig {
    /// Build a config from defaults plus any environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(repository) = std::env::var(REPOSITORY_ENV)
            && !repository.is_empty()
        {
            config.repository_url = repository;
        }
        if let Ok(cache_root) = std::env::var(CACHE_ROOT_ENV)
            && !cache_root.is_empty()
        {
            config.cache_root = PathBuf::from(cache_root);
        }
        config
    }
}

/// Platform-local data directory, `<data_local_dir>/stager/products`.
pub fn default_cache_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stager")
        .join("products")
}
