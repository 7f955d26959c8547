//! Upload to the application's `/api/ocr` endpoint
//!
//! The image is sent as the binary multipart field `image`. The endpoint answers
//! `{"result": [...annotations]}` on success and `{"error": "..."}` otherwise.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{network_error, read_body, OcrSubmitter, SubmitError};
use crate::vision::{EncodedImage, OcrResult, TextAnnotation};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Body returned by the OCR endpoint
#[derive(Debug, Deserialize)]
struct EndpointResponse {
    #[serde(default)]
    result: Option<Vec<TextAnnotation>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Submitter posting to an OCR endpoint
#[derive(Debug, Clone)]
pub struct EndpointSubmitter {
    client: reqwest::Client,
    url: String,
}

impl EndpointSubmitter {
    /// Create a submitter for `url` without a request timeout
    pub fn new(url: impl Into<String>) -> Result<Self, SubmitError> {
        Self::with_timeout(url, None)
    }

    /// Create a submitter with an optional overall request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, SubmitError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(network_error)?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OcrSubmitter for EndpointSubmitter {
    async fn submit(&self, image: &EncodedImage) -> Result<OcrResult, SubmitError> {
        if image.is_empty() {
            return Err(SubmitError::EmptyPayload);
        }

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name("receipt"))
            .mime_str(image.format.mime())
            .map_err(network_error)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        info!("Submitting {} KB image to {}", image.len() / 1024, self.url);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body = read_body(response).await;
        debug!("OCR endpoint answered {} ({} bytes)", status, body.len());

        interpret_response(status, &body)
    }
}

/// Map an endpoint status and body to a result
pub(crate) fn interpret_response(status: u16, body: &str) -> Result<OcrResult, SubmitError> {
    let parsed: Option<EndpointResponse> = serde_json::from_str(body).ok();
    let success = (200..300).contains(&status);

    match parsed {
        Some(EndpointResponse { result: Some(annotations), .. }) if success => {
            Ok(OcrResult::new(annotations))
        }
        Some(EndpointResponse { error: Some(message), details, .. }) => {
            if let Some(details) = details {
                debug!("OCR endpoint error details: {}", details);
            }
            Err(SubmitError::ServerError { status, message })
        }
        Some(_) if success => Err(SubmitError::ServerError {
            status,
            message: "OCR response contained no result".to_string(),
        }),
        None if success => Err(SubmitError::ServerError {
            status,
            message: "OCR response was not valid JSON".to_string(),
        }),
        _ => Err(SubmitError::generic_server_error(status)),
    }
}
