//! Still-frame capture from a leased camera

use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

use super::camera::{CameraError, CameraLease};
use crate::vision::{EncodedFormat, EncodedImage};

/// Grab one frame from the lease and encode it losslessly as PNG
///
/// Fails with `NotReady` while the stream has no natural size yet.
pub fn capture_still(lease: &mut CameraLease) -> Result<EncodedImage, CameraError> {
    let (width, height) = lease.natural_size();
    if width == 0 || height == 0 {
        return Err(CameraError::NotReady);
    }

    let frame = lease.grab()?;
    let raster = RgbaImage::from_raw(frame.width, frame.height, frame.data)
        .ok_or(CameraError::NotReady)?;

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(raster).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    debug!("Captured {}x{} frame ({} KB)", frame.width, frame.height, bytes.len() / 1024);

    Ok(EncodedImage::new(EncodedFormat::Png, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::tests::FakeTrack;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn lease(width: u32, height: u32) -> CameraLease {
        CameraLease::new(Box::new(FakeTrack {
            width,
            height,
            stops: Arc::new(AtomicUsize::new(0)),
        }))
    }

    #[test]
    fn test_capture_encodes_png_at_natural_size() {
        let mut lease = lease(16, 9);
        let still = capture_still(&mut lease).unwrap();
        assert_eq!(still.format, EncodedFormat::Png);
        assert_eq!(still.quality, None);

        let decoded = image::load_from_memory(&still.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 9));
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [200, 120, 40, 255]);
    }

    #[test]
    fn test_capture_before_stream_ready() {
        let mut lease = lease(0, 0);
        assert!(matches!(capture_still(&mut lease), Err(CameraError::NotReady)));
    }
}
