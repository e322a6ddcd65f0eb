use serde::Deserialize;
use std::path::PathBuf;

use crate::util::non_blank;

/// Raw configuration as written in `pictag.toml`. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub labels: FileLabelsConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDatabaseConfig {
    pub url: Option<String>,
    pub reset_on_start: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileStorageConfig {
    pub upload_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLabelsConfig {
    pub backend: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub api_key_header: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_results: Option<u32>,
}

/// Values picked up from the process environment (after `.env`).
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
    pub database_url: Option<String>,
    /// Kept raw so the loader can reject values it cannot read.
    pub database_reset_on_start: Option<String>,
    pub upload_dir: Option<PathBuf>,
    pub label_backend: Option<String>,
    pub label_endpoint: Option<String>,
    pub label_api_key: Option<String>,
    pub label_api_key_file: Option<PathBuf>,
    pub label_api_key_header: Option<String>,
    pub label_timeout_secs: Option<u64>,
    pub label_max_results: Option<u32>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; `gather` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_blank(lookup(name));
        let path = |name: &str| var(name).map(PathBuf::from);

        Self {
            config_path: path("PICTAG_CONFIG_PATH"),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT").and_then(|s| s.parse().ok()),
            max_upload_bytes: var("MAX_UPLOAD_BYTES").and_then(|s| s.parse().ok()),
            database_url: var("DATABASE_URL"),
            database_reset_on_start: var("DATABASE_RESET_ON_START"),
            upload_dir: path("UPLOAD_DIR"),
            label_backend: var("LABEL_BACKEND"),
            label_endpoint: var("LABEL_ENDPOINT"),
            label_api_key: var("LABEL_API_KEY"),
            label_api_key_file: path("LABEL_API_KEY_FILE"),
            label_api_key_header: var("LABEL_API_KEY_HEADER"),
            label_timeout_secs: var("LABEL_TIMEOUT_SECS").and_then(|s| s.parse().ok()),
            label_max_results: var("LABEL_MAX_RESULTS").and_then(|s| s.parse().ok()),
        }
    }
}
