//! Raw frames grabbed from a live video track

use std::time::Instant;

/// A single still grabbed from a camera track
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Raw RGBA pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Instant the frame was grabbed
    pub timestamp: Instant,
}

impl RawFrame {
    /// Create a new frame from RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
