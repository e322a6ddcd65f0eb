use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LabelProvider, ProviderCapabilities, ProviderError, ProviderSettings};
use crate::domain::ImageSource;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com";

const ANNOTATE_PATH: &str = "/v1/images:annotate";

/// Label detection through the `images:annotate` REST API.
#[derive(Debug, Clone)]
pub struct CloudVisionProvider {
    client: reqwest::Client,
    annotate_url: String,
    api_key: Option<String>,
    max_results: u32,
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: ImagePayload<'a>,
    features: [Feature; 1],
}

#[derive(Serialize)]
#[serde(untagged)]
enum ImagePayload<'a> {
    Source { source: ImageUri<'a> },
    Content { content: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageUri<'a> {
    image_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

impl CloudVisionProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let base = settings.endpoint.trim_end_matches('/');
        if base.is_empty() {
            return Err(ProviderError::Config(
                "vision endpoint must not be empty".into(),
            ));
        }

        Ok(Self {
            client: settings.http_client()?,
            annotate_url: format!("{base}{ANNOTATE_PATH}"),
            api_key: settings.api_key,
            max_results: settings.max_results.max(1),
        })
    }

    async fn payload(
        source: &ImageSource,
    ) -> Result<ImagePayload<'_>, ProviderError> {
        match source {
            ImageSource::Remote(url) => Ok(ImagePayload::Source {
                source: ImageUri {
                    image_uri: url.as_str(),
                },
            }),
            ImageSource::Local(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|source| {
                    ProviderError::LocalRead {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                Ok(ImagePayload::Content {
                    content: STANDARD.encode(bytes),
                })
            }
        }
    }
}

#[async_trait]
impl LabelProvider for CloudVisionProvider {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_local_files: true,
        }
    }

    async fn fetch_labels(
        &self,
        source: &ImageSource,
    ) -> Result<Vec<String>, ProviderError> {
        let body = AnnotateRequest {
            requests: [ImageRequest {
                image: Self::payload(source).await?,
                features: [Feature {
                    kind: "LABEL_DETECTION",
                    max_results: self.max_results,
                }],
            }],
        };

        let mut request = self.client.post(&self.annotate_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = %status, bytes = text.len(), "vision annotate response");

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::InvalidApiKey);
        }

        let parsed: Option<AnnotateResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.error)
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or(text);
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body: message,
            });
        }

        let parsed = parsed.ok_or_else(|| {
            ProviderError::ParseError("annotate response is not valid JSON".into())
        })?;

        if let Some(error) = parsed.error.filter(|e| !e.message.is_empty()) {
            return Err(ProviderError::ApiError(error.message));
        }

        let first = parsed.responses.into_iter().next().ok_or_else(|| {
            ProviderError::ParseError("annotate response has no entries".into())
        })?;

        if let Some(error) = first.error.filter(|e| !e.message.is_empty()) {
            return Err(ProviderError::ApiError(error.message));
        }

        Ok(first
            .label_annotations
            .into_iter()
            .map(|label| label.description)
            .collect())
    }
}
