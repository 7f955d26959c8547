//! File-backed camera source
//!
//! Serves a single still image as if it were a live camera stream. Used by the
//! command line front end, where a photo taken elsewhere stands in for the device
//! camera.

use async_trait::async_trait;
use image::RgbaImage;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use super::camera::{CameraError, CameraRequest, CameraSource, VideoTrack};
use super::frame::RawFrame;

/// Camera source that replays an image file
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    /// Create a source for the image at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraSource for StillImageCamera {
    async fn acquire(&self, request: CameraRequest) -> Result<Box<dyn VideoTrack>, CameraError> {
        debug!("Opening still image {:?} (facing {:?})", self.path, request.facing);

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => CameraError::DeviceNotFound,
            ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            _ => CameraError::Unsupported(e.to_string()),
        })?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| CameraError::Unsupported(e.to_string()))?
            .to_rgba8();

        Ok(Box::new(StillTrack { image: Some(image) }))
    }
}

/// Track over a decoded still; stopping it drops the pixels
struct StillTrack {
    image: Option<RgbaImage>,
}

impl VideoTrack for StillTrack {
    fn natural_size(&self) -> (u32, u32) {
        self.image
            .as_ref()
            .map(|image| image.dimensions())
            .unwrap_or((0, 0))
    }

    fn grab(&mut self) -> Result<RawFrame, CameraError> {
        let image = self.image.as_ref().ok_or(CameraError::NotReady)?;
        let (width, height) = image.dimensions();
        Ok(RawFrame::new(image.as_raw().clone(), width, height))
    }

    fn stop(&mut self) {
        self.image = None;
    }
}
