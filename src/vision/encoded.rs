//! Encoded (container-format) images passed between pipeline stages

/// Container format of an encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    Png,
    Jpeg,
    WebP,
}

impl EncodedFormat {
    /// MIME type for this format
    pub fn mime(&self) -> &'static str {
        match self {
            EncodedFormat::Png => "image/png",
            EncodedFormat::Jpeg => "image/jpeg",
            EncodedFormat::WebP => "image/webp",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            EncodedFormat::Png => "png",
            EncodedFormat::Jpeg => "jpg",
            EncodedFormat::WebP => "webp",
        }
    }

    /// Sniff the format from the leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(EncodedFormat::Png),
            image::ImageFormat::Jpeg => Some(EncodedFormat::Jpeg),
            image::ImageFormat::WebP => Some(EncodedFormat::WebP),
            _ => None,
        }
    }
}

/// An image in a standard container format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Container format
    pub format: EncodedFormat,
    /// Lossy quality the image was encoded with (1-100), if any
    pub quality: Option<u8>,
    /// Encoded bytes
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// Wrap losslessly encoded bytes
    pub fn new(format: EncodedFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            quality: None,
            bytes,
        }
    }

    /// Wrap bytes encoded at a given lossy quality
    pub fn with_quality(format: EncodedFormat, quality: u8, bytes: Vec<u8>) -> Self {
        Self {
            format,
            quality: Some(quality),
            bytes,
        }
    }

    /// Wrap bytes of unknown origin, sniffing the format
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        EncodedFormat::sniff(&bytes).map(|format| Self::new(format, bytes))
    }

    /// Size of the encoded payload in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name used when uploading this image
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}
