use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LabelProvider, ProviderCapabilities, ProviderError, ProviderSettings};
use crate::domain::ImageSource;

/// Relays usually run next to the server; override through configuration.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/labels";

pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

/// Client for a URL-only labelling relay.
///
/// Request: `POST {endpoint}` with `{"source": <url>, "sourceType": "url"}`.
/// Response: `{"labels": ["..", ..]}`, or an object carrying `error` /
/// `message` when the relay could not label the image.
#[derive(Debug, Clone)]
pub struct RelayProvider {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    api_key: Option<(HeaderName, HeaderValue)>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    source: &'a str,
    source_type: &'static str,
}

#[derive(Deserialize)]
struct RelayResponse {
    labels: Option<Vec<String>>,
    error: Option<serde_json::Value>,
    message: Option<String>,
}

impl RelayProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let endpoint = reqwest::Url::parse(&settings.endpoint).map_err(|e| {
            ProviderError::Config(format!(
                "invalid relay endpoint '{}': {e}",
                settings.endpoint
            ))
        })?;

        let api_key = match &settings.api_key {
            Some(key) => {
                let name = HeaderName::from_bytes(settings.api_key_header.as_bytes())
                    .map_err(|e| {
                        ProviderError::Config(format!(
                            "invalid API key header '{}': {e}",
                            settings.api_key_header
                        ))
                    })?;
                let mut value = HeaderValue::from_str(key)
                    .map_err(|_| ProviderError::InvalidApiKey)?;
                value.set_sensitive(true);
                Some((name, value))
            }
            None => None,
        };

        Ok(Self {
            client: settings.http_client()?,
            endpoint,
            api_key,
        })
    }
}

fn describe_error(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

#[async_trait]
impl LabelProvider for RelayProvider {
    fn name(&self) -> &'static str {
        "relay"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_local_files: false,
        }
    }

    async fn fetch_labels(
        &self,
        source: &ImageSource,
    ) -> Result<Vec<String>, ProviderError> {
        let ImageSource::Remote(url) = source else {
            return Err(ProviderError::UnsupportedSource {
                provider: self.name(),
            });
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&RelayRequest {
            source: url.as_str(),
            source_type: "url",
        });
        if let Some((name, value)) = &self.api_key {
            request = request.header(name.clone(), value.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = %status, bytes = text.len(), "relay response");

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::InvalidApiKey);
        }
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: RelayResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(error) = parsed.error.filter(|e| !e.is_null()) {
            return Err(ProviderError::ApiError(describe_error(&error)));
        }

        match parsed.labels {
            Some(labels) => Ok(labels),
            None => Err(match parsed.message {
                Some(message) => ProviderError::ApiError(message),
                None => ProviderError::ParseError(
                    "relay response has no labels".into(),
                ),
            }),
        }
    }
}
