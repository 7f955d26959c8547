//! OCR result model
//!
//! Annotations follow the cloud provider's layout: element 0 holds the full-image
//! transcription, the remaining elements hold the individual detected tokens.

use serde::{Deserialize, Serialize};

/// Corner of a bounding polygon, in source-image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vertex {
    /// Omitted by the provider when zero
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

/// Polygon enclosing a detected text region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

impl BoundingPoly {
    /// Axis-aligned bounds as (x, y, width, height)
    pub fn bounds(&self) -> Option<(i32, i32, u32, u32)> {
        let min_x = self.vertices.iter().map(|v| v.x).min()?;
        let min_y = self.vertices.iter().map(|v| v.y).min()?;
        let max_x = self.vertices.iter().map(|v| v.x).max()?;
        let max_y = self.vertices.iter().map(|v| v.y).max()?;
        Some((min_x, min_y, max_x.abs_diff(min_x), max_y.abs_diff(min_y)))
    }
}

/// Single recognized-text annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    /// Recognized text
    #[serde(default)]
    pub description: String,
    /// Detected language, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Region the text was found in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_poly: Option<BoundingPoly>,
}

impl TextAnnotation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            locale: None,
            bounding_poly: None,
        }
    }
}

/// Ordered text annotations for one image
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OcrResult {
    pub annotations: Vec<TextAnnotation>,
}

impl OcrResult {
    pub fn new(annotations: Vec<TextAnnotation>) -> Self {
        Self { annotations }
    }

    /// Full-image transcription, empty if nothing was recognized
    pub fn full_text(&self) -> &str {
        self.annotations
            .first()
            .map(|a| a.description.as_str())
            .unwrap_or("")
    }

    /// Per-token detections (everything after the full transcription)
    pub fn tokens(&self) -> &[TextAnnotation] {
        self.annotations.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }
}

impl std::ops::Index<usize> for OcrResult {
    type Output = TextAnnotation;

    fn index(&self, index: usize) -> &Self::Output {
        &self.annotations[index]
    }
}
