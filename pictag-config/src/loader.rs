use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

use pictag_core::providers::{ProviderBackend, relay::DEFAULT_API_KEY_HEADER};

use crate::models::{
    Config, ConfigMetadata, DEFAULT_DATABASE_URL, DEFAULT_HOST,
    DEFAULT_MAX_RESULTS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
    DEFAULT_TIMEOUT_SECS, DEFAULT_UPLOAD_DIR, DatabaseConfig, LabelsConfig,
    ServerConfig, StorageConfig,
};
use crate::sources::{EnvConfig, FileConfig, FileLabelsConfig};
use crate::util::{non_blank, parse_bool};
use crate::validation::ConfigWarnings;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("pictag.toml"),
        PathBuf::from("config/pictag.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Never wipe the catalog on start, whatever the sources say.
    pub keep_data: bool,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Load `.env`, then the process environment and the config file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        }
        .or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(err),
        })?;

        self.load_with_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Same as [`load`](Self::load) with an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(
            file_config,
            env,
            config_path,
            env_file_loaded,
            self.options.keep_data,
        )?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
    keep_data: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No pictag.toml detected; using environment variables and defaults",
            "Create pictag.toml or set PICTAG_CONFIG_PATH to customise the server",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        storage: file_storage,
        labels: file_labels,
    } = file_config.unwrap_or_default();

    let max_upload_bytes = env
        .max_upload_bytes
        .or(file_server.max_upload_bytes)
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    if max_upload_bytes == 0 {
        return Err(ConfigLoadError::Invalid {
            field: "server.max_upload_bytes",
            reason: "must be greater than zero".into(),
        });
    }

    let server = ServerConfig {
        host: env
            .server_host
            .clone()
            .or(non_blank(file_server.host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        max_upload_bytes,
    };

    let reset_on_start = env_reset_on_start(&env)?
        .or(file_database.reset_on_start)
        .unwrap_or(true);
    let database = DatabaseConfig {
        url: env
            .database_url
            .clone()
            .or(non_blank(file_database.url))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
        reset_on_start: reset_on_start && !keep_data,
    };
    if database.reset_on_start {
        warnings.push_with_hint(
            "The image catalog is wiped on every start",
            "Pass --keep-data or set DATABASE_RESET_ON_START=false to keep entries",
        );
    }

    let storage = StorageConfig {
        upload_dir: env
            .upload_dir
            .clone()
            .or(file_storage.upload_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
    };

    let labels = resolve_labels(&env, file_labels, &mut warnings)?;

    let config = Config {
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
        server,
        database,
        storage,
        labels,
    };

    Ok((config, warnings))
}

fn env_reset_on_start(env: &EnvConfig) -> Result<Option<bool>, ConfigLoadError> {
    let Some(raw) = env.database_reset_on_start.as_deref() else {
        return Ok(None);
    };
    parse_bool(raw).map(Some).ok_or_else(|| ConfigLoadError::Invalid {
        field: "DATABASE_RESET_ON_START",
        reason: format!("expected true or false, got '{raw}'"),
    })
}

fn resolve_labels(
    env: &EnvConfig,
    file: FileLabelsConfig,
    warnings: &mut ConfigWarnings,
) -> Result<LabelsConfig, ConfigLoadError> {
    let backend = match env.label_backend.clone().or(non_blank(file.backend.clone())) {
        Some(raw) => raw
            .parse::<ProviderBackend>()
            .map_err(|_| ConfigLoadError::UnknownBackend { value: raw })?,
        None => ProviderBackend::default(),
    };

    let endpoint = env
        .label_endpoint
        .clone()
        .or(non_blank(file.endpoint.clone()))
        .unwrap_or_else(|| backend.default_endpoint().to_string());
    Url::parse(&endpoint).map_err(|source| ConfigLoadError::InvalidEndpoint {
        endpoint: endpoint.clone(),
        source,
    })?;
    if backend == ProviderBackend::Relay && endpoint == backend.default_endpoint() {
        warnings.push_with_hint(
            format!("Relay backend is using the default endpoint {endpoint}"),
            "Set LABEL_ENDPOINT to the relay's address",
        );
    }

    let api_key = resolve_api_key(env, &file)?;
    if api_key.is_none() {
        warnings.push_with_hint(
            format!("No API key configured for the {backend} label backend"),
            "Set LABEL_API_KEY or LABEL_API_KEY_FILE; requests will likely be rejected",
        );
    }

    let timeout_secs = env
        .label_timeout_secs
        .or(file.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(ConfigLoadError::Invalid {
            field: "labels.timeout_secs",
            reason: "must be greater than zero".into(),
        });
    }

    Ok(LabelsConfig {
        backend,
        endpoint,
        api_key,
        api_key_header: env
            .label_api_key_header
            .clone()
            .or(non_blank(file.api_key_header))
            .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
        timeout: Duration::from_secs(timeout_secs),
        max_results: env
            .label_max_results
            .or(file.max_results)
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .max(1),
    })
}

/// Inline keys win over key files; environment wins over the config file.
fn resolve_api_key(
    env: &EnvConfig,
    file: &FileLabelsConfig,
) -> Result<Option<String>, ConfigLoadError> {
    if let Some(key) = env.label_api_key.clone() {
        return Ok(Some(key));
    }
    if let Some(path) = &env.label_api_key_file {
        return read_secret_file(path);
    }
    if let Some(key) = non_blank(file.api_key.clone()) {
        return Ok(Some(key));
    }
    match &file.api_key_file {
        Some(path) => read_secret_file(path),
        None => Ok(None),
    }
}

fn read_secret_file(path: &Path) -> Result<Option<String>, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::SecretFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to read secret file {path}")]
    SecretFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown label backend '{value}' (expected 'vision' or 'relay')")]
    UnknownBackend { value: String },
    #[error("invalid label endpoint '{endpoint}'")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}
