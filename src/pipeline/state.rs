//! Pipeline state for one capture session

use crate::vision::{EncodedImage, OcrResult};

/// Phase of the capture → compress → submit flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// No image
    Idle,
    /// Original captured, compression pending
    Captured,
    /// Compressed image ready to submit
    Compressed,
    /// OCR request in flight
    Submitting,
    /// OCR result available
    Done,
    /// Last submission failed
    Failed,
}

/// Mutable session state observed by the view layer
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// First-stage capture
    pub original: Option<EncodedImage>,
    /// Resized and re-encoded copy of `original`
    pub compressed: Option<EncodedImage>,
    /// Result of the last successful submit
    pub result: Option<OcrResult>,
    /// True strictly between submit start and submit end
    pub loading: bool,
    /// User-facing error message
    pub error: Option<String>,
    /// Whether a camera stream is live
    pub camera_ready: bool,
    /// True while a captured image is being compressed
    pub(crate) compressing: bool,
    /// Bumped whenever `original` changes; stale async work compares against it
    pub(crate) generation: u64,
    /// Whether `error` came from the last submit
    pub(crate) submit_failed: bool,
}

impl PipelineState {
    /// Current phase, derived from the fields
    pub fn phase(&self) -> PipelinePhase {
        if self.loading {
            PipelinePhase::Submitting
        } else if self.result.is_some() {
            PipelinePhase::Done
        } else if self.submit_failed {
            PipelinePhase::Failed
        } else if self.compressed.is_some() {
            PipelinePhase::Compressed
        } else if self.original.is_some() {
            PipelinePhase::Captured
        } else {
            PipelinePhase::Idle
        }
    }

    /// Whether the submit action should be enabled
    pub fn can_submit(&self) -> bool {
        self.compressed.is_some() && !self.loading
    }

    /// Replace the original image, invalidating everything derived from it
    pub(crate) fn set_original(&mut self, image: EncodedImage) {
        self.original = Some(image);
        self.compressed = None;
        self.result = None;
        self.error = None;
        self.submit_failed = false;
        self.generation += 1;
    }

    /// Drop all images and results
    pub(crate) fn clear_images(&mut self) {
        self.original = None;
        self.compressed = None;
        self.result = None;
        self.error = None;
        self.submit_failed = false;
        self.generation += 1;
    }

    /// Set a user-facing error
    pub(crate) fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// Record the error of a failed submit
    pub(crate) fn set_submit_error(&mut self, error: impl Into<String>) {
        self.set_error(error);
        self.submit_failed = true;
    }
}
