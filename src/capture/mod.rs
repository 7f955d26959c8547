//! Camera Layer
//!
//! Acquires a device camera with guaranteed release and turns the live stream
//! into encoded stills.

pub mod camera;
pub mod capturer;
pub mod frame;
pub mod still;

pub use camera::{open_camera, CameraError, CameraLease, CameraRequest, CameraSource, FacingMode, VideoTrack};
pub use capturer::capture_still;
pub use frame::RawFrame;
pub use still::StillImageCamera;
