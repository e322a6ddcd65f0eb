use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use pictag_core::providers::{ProviderBackend, ProviderSettings};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://database/collection.db";
pub const DEFAULT_UPLOAD_DIR: &str = "static/images";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Fully resolved configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub metadata: ConfigMetadata,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub labels: LabelsConfig,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on request bodies, multipart uploads included.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Drop and recreate the catalog table on startup.
    pub reset_on_start: bool,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
}

#[derive(Clone)]
pub struct LabelsConfig {
    pub backend: ProviderBackend,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub timeout: Duration,
    pub max_results: u32,
}

impl fmt::Debug for LabelsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelsConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_header", &self.api_key_header)
            .field("timeout", &self.timeout)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl LabelsConfig {
    pub fn provider_settings(&self) -> ProviderSettings {
        let mut settings =
            ProviderSettings::new(self.endpoint.clone()).with_timeout(self.timeout);
        settings.api_key = self.api_key.clone();
        settings.api_key_header = self.api_key_header.clone();
        settings.max_results = self.max_results;
        settings
    }
}
