//! OCR submission
//!
//! Ships a compressed image to a recognizer and returns its annotations.
//! Backends:
//! - The application's own `/api/ocr` endpoint (multipart upload)
//! - Google Cloud Vision `images:annotate` called directly

pub mod endpoint;
pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::vision::{EncodedImage, OcrResult};

pub use endpoint::EndpointSubmitter;
pub use google::GoogleVisionSubmitter;

/// Errors raised while submitting an image for recognition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("no image to submit")]
    EmptyPayload,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("{message}")]
    ServerError { status: u16, message: String },
}

impl SubmitError {
    /// Server error with the generic message used when the body carries none
    pub fn generic_server_error(status: u16) -> Self {
        SubmitError::ServerError {
            status,
            message: format!("OCR request failed with status {}", status),
        }
    }
}

/// Recognizer the pipeline submits images to
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait OcrSubmitter: Send + Sync {
    /// Submit an encoded image and wait for its annotations
    async fn submit(&self, image: &EncodedImage) -> Result<OcrResult, SubmitError>;
}

/// OCR backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Upload to the application's OCR endpoint
    #[default]
    Endpoint,
    /// Call Google Cloud Vision directly
    GoogleVision,
}

fn network_error(e: reqwest::Error) -> SubmitError {
    SubmitError::NetworkError(e.to_string())
}

/// Read a response body once the status line has arrived
///
/// A body that cannot be read is treated as empty, so the answer is judged on its
/// status alone.
async fn read_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!("Could not read response body: {}", e);
            String::new()
        }
    }
}
