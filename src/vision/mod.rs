//! Image and OCR data layer
//!
//! Encoded images flowing through the pipeline, the compressor that shrinks them
//! before upload, and the annotation model returned by the recognizer.

pub mod compress;
pub mod encoded;
pub mod ocr;

pub use compress::{compress, target_dimensions, try_compress, CompressError, CompressOptions};
pub use encoded::{EncodedFormat, EncodedImage};
pub use ocr::{BoundingPoly, OcrResult, TextAnnotation, Vertex};
