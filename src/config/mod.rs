//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{CameraRequest, FacingMode};
use crate::ocr::OcrBackend;
use crate::vision::CompressOptions;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Camera settings
    pub camera: CameraSettings,
    /// Compression settings
    pub compression: CompressionSettings,
    /// OCR settings
    pub ocr: OcrSettings,
}

/// Camera-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Preferred camera
    pub facing: FacingMode,
    /// Seconds to wait for the camera before giving up
    pub acquire_timeout_secs: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            acquire_timeout_secs: 10,
        }
    }
}

impl CameraSettings {
    pub fn request(&self) -> CameraRequest {
        CameraRequest {
            facing: self.facing,
            audio: false,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs.max(1))
    }
}

/// Compression-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Longest allowed edge in pixels
    pub max_dimension: u32,
    /// JPEG quality factor (0.0 - 1.0)
    pub quality: f32,
    /// Convert to grayscale before upload
    pub grayscale: bool,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 0.7,
            grayscale: false,
        }
    }
}

impl CompressionSettings {
    /// Options for the compressor, with out-of-range values clamped
    pub fn options(&self) -> CompressOptions {
        CompressOptions {
            max_dimension: self.max_dimension.max(1),
            quality: if self.quality.is_finite() {
                self.quality.clamp(0.0, 1.0)
            } else {
                CompressOptions::default().quality
            },
            grayscale: self.grayscale,
        }
    }
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Which recognizer to submit to
    pub backend: OcrBackend,
    /// URL of the OCR endpoint
    pub endpoint: String,
    /// Environment variable holding the Cloud Vision API key
    pub api_key_env: String,
    /// Overall request timeout; none waits indefinitely
    pub request_timeout_secs: Option<u64>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Endpoint,
            endpoint: "http://localhost:5173/api/ocr".to_string(),
            api_key_env: "GOOGLE_VISION_API_KEY".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl OcrSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "receiptscan", "ReceiptScan")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
