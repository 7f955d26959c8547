//! Capture → Compress → OCR pipeline
//!
//! One `Pipeline` exists per capture session. It owns the session's
//! `PipelineState` and is the only thing that mutates it. Handles are cheap to
//! clone so a submission can outlive the view that started it; the state lock is
//! never held across an await.

pub mod state;

pub use state::{PipelinePhase, PipelineState};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::capture::{self, CameraError, CameraLease, CameraRequest, CameraSource};
use crate::ocr::{OcrSubmitter, SubmitError};
use crate::vision::{compress, CompressOptions, EncodedImage};

/// Outcome of `Pipeline::process`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Images were cleared
    Cleared,
    /// Original stored and its compressed copy is ready
    Compressed,
    /// Another capture was still compressing; nothing changed
    Busy,
    /// The session moved on while compressing; the output was dropped
    Stale,
}

/// Outcome of `Pipeline::submit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No compressed image; no request was made
    Skipped,
    /// A request was already in flight; no request was made
    Rejected,
    /// Result stored in the state
    Completed,
    /// Error stored in the state
    Failed(SubmitError),
    /// The image was retaken while the request was in flight; response dropped
    Discarded,
}

/// Marks a submit as in flight; clears `loading` if the submit future is dropped
struct InFlight {
    state: Arc<Mutex<PipelineState>>,
    armed: bool,
}

impl InFlight {
    fn start(state: &Arc<Mutex<PipelineState>>) -> Self {
        Self {
            state: state.clone(),
            armed: true,
        }
    }

    /// The submit finished normally; the caller clears `loading` under its own lock
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.armed {
            debug!("Submit cancelled while in flight");
            self.state.lock().loading = false;
        }
    }
}

/// Session handle for the capture pipeline
#[derive(Clone)]
pub struct Pipeline {
    id: Uuid,
    state: Arc<Mutex<PipelineState>>,
    submitter: Arc<dyn OcrSubmitter>,
    options: CompressOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Pipeline {
    /// Start a new session with empty state
    pub fn new(submitter: Arc<dyn OcrSubmitter>, options: CompressOptions) -> Self {
        let id = Uuid::new_v4();
        debug!("Pipeline session {} created", id);

        Self {
            id,
            state: Arc::new(Mutex::new(PipelineState::default())),
            submitter,
            options,
        }
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Compression settings used by this session
    pub fn options(&self) -> &CompressOptions {
        &self.options
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> PipelineState {
        self.state.lock().clone()
    }

    /// Current phase
    pub fn phase(&self) -> PipelinePhase {
        self.state.lock().phase()
    }

    /// Whether a submit would start a request
    pub fn can_submit(&self) -> bool {
        self.state.lock().can_submit()
    }

    /// Acquire the camera for this session
    ///
    /// The returned lease belongs to the caller's view; dropping it stops the
    /// camera. Failures are recorded as the session error.
    pub async fn open_camera(
        &self,
        source: &dyn CameraSource,
        request: CameraRequest,
        timeout: Duration,
    ) -> Result<CameraLease, CameraError> {
        let span = info_span!("camera", session = %self.id);
        let result = capture::open_camera(source, request, timeout).instrument(span).await;

        let mut state = self.state.lock();
        match &result {
            Ok(_) => {
                state.camera_ready = true;
                state.error = None;
            }
            Err(e) => {
                state.camera_ready = false;
                state.set_error(e.to_string());
            }
        }

        result
    }

    /// Stop the camera and mark it unavailable
    pub fn close_camera(&self, lease: CameraLease) {
        lease.release();
        self.state.lock().camera_ready = false;
    }

    /// Capture a still from the lease and run it through compression
    pub async fn capture(&self, lease: &mut CameraLease) -> Result<ProcessOutcome, CameraError> {
        if self.state.lock().compressing {
            debug!("Capture ignored: previous capture still compressing");
            return Ok(ProcessOutcome::Busy);
        }

        match capture::capture_still(lease) {
            Ok(still) => Ok(self.process(Some(still)).await),
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.state.lock().set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Store a new original image and compress it
    ///
    /// `None` clears both images. Compression runs on a blocking worker and never
    /// fails: on error the original is used as the compressed image.
    pub async fn process(&self, image: Option<EncodedImage>) -> ProcessOutcome {
        let Some(image) = image else {
            self.state.lock().clear_images();
            return ProcessOutcome::Cleared;
        };

        let generation = {
            let mut state = self.state.lock();
            if state.compressing {
                return ProcessOutcome::Busy;
            }
            state.set_original(image.clone());
            state.compressing = true;
            state.generation
        };

        let options = self.options;
        let original = image.clone();
        let compressed = match tokio::task::spawn_blocking(move || compress(&original, &options)).await {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!("Compression worker failed, using original image: {}", e);
                image.clone()
            }
        };

        info!(
            session = %self.id,
            "Original {} KB, compressed {} KB",
            image.len() / 1024,
            compressed.len() / 1024
        );

        let mut state = self.state.lock();
        state.compressing = false;
        if state.generation != generation {
            debug!("Compressed image dropped: session moved on");
            return ProcessOutcome::Stale;
        }
        state.compressed = Some(compressed);
        ProcessOutcome::Compressed
    }

    /// Submit the compressed image for OCR
    ///
    /// At most one request is in flight per session. A retake during the request
    /// does not cancel it; its response is dropped on arrival. Dropping the returned
    /// future ends the submit and re-enables submission.
    pub async fn submit(&self) -> SubmitOutcome {
        let span = info_span!("submit", session = %self.id);
        self.submit_inner().instrument(span).await
    }

    async fn submit_inner(&self) -> SubmitOutcome {
        let (image, generation) = {
            let mut state = self.state.lock();
            let Some(image) = state.compressed.clone() else {
                debug!("Submit skipped: no compressed image");
                return SubmitOutcome::Skipped;
            };
            if state.loading {
                debug!("Submit rejected: request already in flight");
                return SubmitOutcome::Rejected;
            }
            state.loading = true;
            state.submit_failed = false;
            state.error = None;
            state.result = None;
            (image, state.generation)
        };

        let in_flight = InFlight::start(&self.state);
        let response = self.submitter.submit(&image).await;

        let mut state = self.state.lock();
        in_flight.disarm();
        state.loading = false;
        if state.generation != generation {
            info!("OCR response discarded: image was retaken");
            return SubmitOutcome::Discarded;
        }

        match response {
            Ok(result) => {
                info!("OCR completed with {} annotations", result.len());
                state.result = Some(result);
                SubmitOutcome::Completed
            }
            Err(e) => {
                warn!("OCR failed: {}", e);
                state.set_submit_error(e.to_string());
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Submit on a detached task that runs to completion independently
    pub fn spawn_submit(&self) -> JoinHandle<SubmitOutcome> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.submit().await })
    }

    /// Discard the captured images, result and error
    pub fn retake(&self) {
        self.state.lock().clear_images();
        debug!(session = %self.id, "Retake: pipeline reset");
    }
}
