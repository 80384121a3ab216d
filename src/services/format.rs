//! Capture format handling service
//!
//! Maps capture formats to MIME types, file extensions and encoder inputs, so
//! the capture pipeline itself stays free of per-format branching.

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encodings a selected photo can be normalized to before upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// Lossy JPEG, the default (no transparency)
    #[default]
    Jpeg,
    /// Lossless PNG with alpha
    Png,
    /// WebP with alpha (requires the `webp-support` feature)
    WebP,
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

impl FromStr for CaptureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(Self::Jpeg),
            "png" | "image/png" => Ok(Self::Png),
            "webp" | "image/webp" => Ok(Self::WebP),
            other => Err(format!("unknown capture format '{other}'")),
        }
    }
}

/// Service for per-format capture decisions
pub struct CaptureFormatHandler;

impl CaptureFormatHandler {
    /// MIME type written into the data URL header
    ///
    /// # Examples
    /// ```rust
    /// use photo_genius::services::{CaptureFormat, CaptureFormatHandler};
    ///
    /// assert_eq!(CaptureFormatHandler::mime_type(CaptureFormat::Jpeg), "image/jpeg");
    /// ```
    #[must_use]
    pub fn mime_type(format: CaptureFormat) -> &'static str {
        match format {
            CaptureFormat::Jpeg => "image/jpeg",
            CaptureFormat::Png => "image/png",
            CaptureFormat::WebP => "image/webp",
        }
    }

    /// File extension without the dot
    #[must_use]
    pub fn get_extension(format: CaptureFormat) -> &'static str {
        match format {
            CaptureFormat::Jpeg => "jpg",
            CaptureFormat::Png => "png",
            CaptureFormat::WebP => "webp",
        }
    }

    /// Encoder format for the `image` crate
    #[must_use]
    pub fn image_format(format: CaptureFormat) -> ImageFormat {
        match format {
            CaptureFormat::Jpeg => ImageFormat::Jpeg,
            CaptureFormat::Png => ImageFormat::Png,
            CaptureFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Whether the format keeps an alpha channel
    #[must_use]
    pub fn supports_transparency(format: CaptureFormat) -> bool {
        match format {
            CaptureFormat::Png | CaptureFormat::WebP => true,
            CaptureFormat::Jpeg => false,
        }
    }

    /// Whether the encoder for this format is compiled in
    #[must_use]
    pub fn is_available(format: CaptureFormat) -> bool {
        match format {
            CaptureFormat::Jpeg | CaptureFormat::Png => true,
            CaptureFormat::WebP => cfg!(feature = "webp-support"),
        }
    }

    /// Convert a decoded bitmap into the pixel layout the encoder accepts
    ///
    /// JPEG has no alpha, so the surface is flattened to RGB. Other formats
    /// keep RGBA.
    #[must_use]
    pub fn prepare_surface(image: &DynamicImage, format: CaptureFormat) -> DynamicImage {
        if Self::supports_transparency(format) {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
    }
}
