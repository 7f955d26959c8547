//! Camera source abstraction
//!
//! A `CameraSource` hands out live video tracks. Every track acquired through
//! `open_camera` is wrapped in a `CameraLease`, which stops the hardware tracks
//! when released or dropped, so teardown and error paths cannot leak them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::frame::RawFrame;

/// Errors raised while acquiring or reading a camera
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera access was denied")]
    PermissionDenied,

    #[error("no camera device was found")]
    DeviceNotFound,

    #[error("camera capture is not supported: {0}")]
    Unsupported(String),

    #[error("camera did not become available within {0:?}")]
    Timeout(Duration),

    #[error("video stream is not ready")]
    NotReady,

    #[error("failed to encode captured frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// Which physical camera to prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Rear-facing camera (receipts, documents)
    #[default]
    Environment,
    /// Front-facing camera
    User,
}

/// Parameters passed to a camera source on acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraRequest {
    /// Preferred camera; sources fall back to any camera if unavailable
    pub facing: FacingMode,
    /// Whether an audio track is requested. Receipt capture never asks for one.
    pub audio: bool,
}

impl Default for CameraRequest {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            audio: false,
        }
    }
}

/// A live video track handed out by a camera source
pub trait VideoTrack: Send {
    /// Natural (sensor) dimensions of the stream; (0, 0) until the stream is ready
    fn natural_size(&self) -> (u32, u32);

    /// Grab the current frame as RGBA pixels
    fn grab(&mut self) -> Result<RawFrame, CameraError>;

    /// Stop all underlying hardware tracks
    fn stop(&mut self);
}

/// Device camera provider
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Acquire a live video track. May suspend while the user answers a
    /// permission prompt.
    async fn acquire(&self, request: CameraRequest) -> Result<Box<dyn VideoTrack>, CameraError>;
}

/// Scoped ownership of a live video track
///
/// Tracks are stopped exactly once, either by `release` or on drop.
pub struct CameraLease {
    track: Option<Box<dyn VideoTrack>>,
}

impl CameraLease {
    /// Wrap an acquired track
    pub fn new(track: Box<dyn VideoTrack>) -> Self {
        Self { track: Some(track) }
    }

    /// Natural dimensions of the leased stream
    pub fn natural_size(&self) -> (u32, u32) {
        self.track
            .as_ref()
            .map(|track| track.natural_size())
            .unwrap_or((0, 0))
    }

    /// Grab a frame from the leased track
    pub fn grab(&mut self) -> Result<RawFrame, CameraError> {
        match self.track.as_mut() {
            Some(track) => track.grab(),
            None => Err(CameraError::NotReady),
        }
    }

    /// Whether the lease still holds a live track
    pub fn is_active(&self) -> bool {
        self.track.is_some()
    }

    /// Stop the hardware tracks now
    pub fn release(mut self) {
        self.stop_tracks();
    }

    fn stop_tracks(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
            info!("Camera tracks stopped");
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

impl std::fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraLease")
            .field("active", &self.is_active())
            .field("natural_size", &self.natural_size())
            .finish()
    }
}

/// Acquire a camera within a bounded wait
///
/// No retries are performed; a failed or timed-out acquisition is reported to the
/// caller, who may try again.
pub async fn open_camera(
    source: &dyn CameraSource,
    request: CameraRequest,
    timeout: Duration,
) -> Result<CameraLease, CameraError> {
    debug!("Requesting camera: facing={:?}, audio={}", request.facing, request.audio);

    match tokio::time::timeout(timeout, source.acquire(request)).await {
        Ok(Ok(track)) => {
            let (width, height) = track.natural_size();
            info!("Camera acquired ({}x{})", width, height);
            Ok(CameraLease::new(track))
        }
        Ok(Err(e)) => {
            warn!("Camera acquisition failed: {}", e);
            Err(e)
        }
        Err(_) => {
            warn!("Camera acquisition timed out after {:?}", timeout);
            Err(CameraError::Timeout(timeout))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Solid-color track that counts how often it was stopped
    pub(crate) struct FakeTrack {
        pub width: u32,
        pub height: u32,
        pub stops: Arc<AtomicUsize>,
    }

    impl VideoTrack for FakeTrack {
        fn natural_size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn grab(&mut self) -> Result<RawFrame, CameraError> {
            let pixels = self.width as usize * self.height as usize;
            Ok(RawFrame::new([200u8, 120, 40, 255].repeat(pixels), self.width, self.height))
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) enum FakeSource {
        Ready { width: u32, height: u32, stops: Arc<AtomicUsize> },
        Denied,
        Missing,
        Hang,
    }

    #[async_trait]
    impl CameraSource for FakeSource {
        async fn acquire(&self, request: CameraRequest) -> Result<Box<dyn VideoTrack>, CameraError> {
            assert!(!request.audio);
            match self {
                FakeSource::Ready { width, height, stops } => Ok(Box::new(FakeTrack {
                    width: *width,
                    height: *height,
                    stops: stops.clone(),
                })),
                FakeSource::Denied => Err(CameraError::PermissionDenied),
                FakeSource::Missing => Err(CameraError::DeviceNotFound),
                FakeSource::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    #[tokio::test]
    async fn test_lease_stops_tracks_on_drop() {
        let stops = Arc::new(AtomicUsize::new(0));
        let source = FakeSource::Ready { width: 4, height: 2, stops: stops.clone() };

        {
            let lease = open_camera(&source, CameraRequest::default(), Duration::from_secs(1))
                .await
                .unwrap();
            assert!(lease.is_active());
            assert_eq!(lease.natural_size(), (4, 2));
        }

        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_stops_tracks_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let source = FakeSource::Ready { width: 4, height: 2, stops: stops.clone() };

        let lease = open_camera(&source, CameraRequest::default(), Duration::from_secs(1))
            .await
            .unwrap();
        lease.release();

        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_is_distinct() {
        let result = open_camera(&FakeSource::Denied, CameraRequest::default(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(CameraError::PermissionDenied)));

        let result = open_camera(&FakeSource::Missing, CameraRequest::default(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(CameraError::DeviceNotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_times_out() {
        let timeout = Duration::from_secs(10);
        let result = open_camera(&FakeSource::Hang, CameraRequest::default(), timeout).await;
        assert!(matches!(result, Err(CameraError::Timeout(t)) if t == timeout));
    }

    #[test]
    fn test_default_request_prefers_rear_camera_without_audio() {
        let request = CameraRequest::default();
        assert_eq!(request.facing, FacingMode::Environment);
        assert!(!request.audio);
    }
}
