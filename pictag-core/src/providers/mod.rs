//! Label providers: external services that turn an image into descriptive
//! terms.
//!
//! Two backends share the [`LabelProvider`] port:
//! - [`CloudVisionProvider`] talks to a cloud vision `images:annotate` API and
//!   accepts both web URLs and local files.
//! - [`RelayProvider`] posts `{"source", "sourceType"}` to a third-party relay
//!   and only understands web URLs.
//!
//! [`LabelClient`] is what the catalog service uses; it folds every provider
//! failure into a single [`LabelAcquisitionError`].

pub mod cloud_vision;
pub mod relay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{any::type_name_of_val, fmt, str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::domain::{ImageSource, Labels};

pub use cloud_vision::CloudVisionProvider;
pub use relay::RelayProvider;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("{provider} only accepts web image URLs")]
    UnsupportedSource { provider: &'static str },

    #[error("failed to read local image {path}: {source}")]
    LocalRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("invalid provider configuration: {0}")]
    Config(String),
}

/// Everything that can go wrong while acquiring labels, reduced to one
/// outcome. `reason` is for the logs, never for users.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no labels available from {provider}: {reason}")]
pub struct LabelAcquisitionError {
    pub provider: &'static str,
    pub reason: String,
}

impl LabelAcquisitionError {
    pub fn new(provider: &'static str, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderCapabilities {
    pub supports_local_files: bool,
}

/// Port for an external image-recognition service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> ProviderCapabilities;

    /// One request, no retries. Terms come back in provider order.
    async fn fetch_labels(&self, source: &ImageSource) -> Result<Vec<String>, ProviderError>;
}

/// Which backend the server should talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderBackend {
    #[default]
    Vision,
    Relay,
}

impl ProviderBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderBackend::Vision => "vision",
            ProviderBackend::Relay => "relay",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderBackend::Vision => cloud_vision::DEFAULT_ENDPOINT,
            ProviderBackend::Relay => relay::DEFAULT_ENDPOINT,
        }
    }
}

impl FromStr for ProviderBackend {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" | "cloud_vision" | "google" => Ok(ProviderBackend::Vision),
            "relay" => Ok(ProviderBackend::Relay),
            other => Err(ProviderError::Config(format!(
                "unknown label backend '{other}' (expected 'vision' or 'relay')"
            ))),
        }
    }
}

impl fmt::Display for ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings shared by both HTTP backends.
#[derive(Clone)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Header carrying the key for the relay backend.
    pub api_key_header: String,
    pub timeout: Duration,
    pub max_results: u32,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_header", &self.api_key_header)
            .field("timeout", &self.timeout)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl ProviderSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            api_key_header: relay::DEFAULT_API_KEY_HEADER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_results: 10,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
            .map_err(ProviderError::NetworkError)
    }
}

/// Build the configured backend.
pub fn build_provider(
    backend: ProviderBackend,
    settings: ProviderSettings,
) -> Result<Arc<dyn LabelProvider>, ProviderError> {
    let provider: Arc<dyn LabelProvider> = match backend {
        ProviderBackend::Vision => Arc::new(CloudVisionProvider::new(settings)?),
        ProviderBackend::Relay => Arc::new(RelayProvider::new(settings)?),
    };
    Ok(provider)
}

/// Normalizes provider output into storable [`Labels`].
#[derive(Clone)]
pub struct LabelClient {
    provider: Arc<dyn LabelProvider>,
}

impl fmt::Debug for LabelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelClient")
            .field("provider", &type_name_of_val(self.provider.as_ref()))
            .finish()
    }
}

impl LabelClient {
    pub fn new(provider: Arc<dyn LabelProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        self.provider.capabilities()
    }

    pub async fn acquire(&self, source: &ImageSource) -> Result<Labels, LabelAcquisitionError> {
        let provider = self.provider.name();

        let terms = self.provider.fetch_labels(source).await.map_err(|err| {
            warn!(provider, source = %source, error = %err, "label request failed");
            LabelAcquisitionError::new(provider, err.to_string())
        })?;

        let labels = Labels::from_terms(&terms).ok_or_else(|| {
            warn!(provider, source = %source, "provider returned no labels");
            LabelAcquisitionError::new(provider, "provider returned no labels")
        })?;

        debug!(provider, source = %source, labels = %labels, "labels acquired");
        Ok(labels)
    }
}
