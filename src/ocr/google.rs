//! Google Cloud Vision backend
//!
//! Calls `images:annotate` with a single `TEXT_DETECTION` request. The provider
//! returns the full transcription first, followed by per-word annotations.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::{network_error, read_body, OcrSubmitter, SubmitError};
use crate::vision::{EncodedImage, OcrResult, TextAnnotation};

/// Public annotate endpoint
pub const DEFAULT_ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Deserialize)]
struct AnnotateBatch {
    #[serde(default)]
    responses: Vec<AnnotateResponse>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

/// Submitter calling Google Cloud Vision with an API key
#[derive(Clone)]
pub struct GoogleVisionSubmitter {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleVisionSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleVisionSubmitter")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl GoogleVisionSubmitter {
    /// Create a submitter against the public endpoint
    pub fn new(api_key: impl Into<String>, timeout: Option<Duration>) -> Result<Self, SubmitError> {
        Self::with_url(DEFAULT_ANNOTATE_URL, api_key, timeout)
    }

    /// Create a submitter against a custom annotate URL
    pub fn with_url(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SubmitError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build().map_err(network_error)?,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl OcrSubmitter for GoogleVisionSubmitter {
    async fn submit(&self, image: &EncodedImage) -> Result<OcrResult, SubmitError> {
        if image.is_empty() {
            return Err(SubmitError::EmptyPayload);
        }

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(&image.bytes) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        info!("Submitting {} KB image to Cloud Vision", image.len() / 1024);

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let text = read_body(response).await;
        debug!("Cloud Vision answered {} ({} bytes)", status, text.len());

        interpret_annotate(status, &text)
    }
}

/// Map an `images:annotate` status and body to a result
fn interpret_annotate(status: u16, body: &str) -> Result<OcrResult, SubmitError> {
    let batch: AnnotateBatch = match serde_json::from_str(body) {
        Ok(batch) => batch,
        Err(_) => return Err(SubmitError::generic_server_error(status)),
    };

    if let Some(error) = batch.error {
        return Err(SubmitError::ServerError {
            status: error.code.unwrap_or(status),
            message: error.message,
        });
    }
    if !(200..300).contains(&status) {
        return Err(SubmitError::generic_server_error(status));
    }

    // An image with no text yields an empty response object
    let Some(response) = batch.responses.into_iter().next() else {
        return Ok(OcrResult::default());
    };
    if let Some(error) = response.error {
        return Err(SubmitError::ServerError {
            status,
            message: error.message,
        });
    }

    Ok(OcrResult::new(response.text_annotations))
}
