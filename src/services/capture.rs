//! Image capture and normalization service
//!
//! Turns a user-selected file into an [`ImagePayload`]: decode into a bitmap,
//! redraw it onto a surface of the bitmap's natural size, re-encode the surface
//! and wrap the bytes in a `data:` URL. File I/O is kept here so the
//! controller only ever sees finished payloads.

use crate::{
    error::CaptureError,
    services::format::{CaptureFormat, CaptureFormatHandler},
    types::ImagePayload,
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Default JPEG quality, matching a browser canvas encoder
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Options controlling how a captured image is re-encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Target encoding
    pub format: CaptureFormat,
    /// JPEG quality (0-100), ignored for lossless formats
    pub jpeg_quality: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Service for capturing user images as embedded payloads
pub struct ImageCaptureService;

impl ImageCaptureService {
    /// Read a file from disk and capture it
    ///
    /// # Errors
    /// - The file cannot be read
    /// - The file is empty or not a decodable image
    /// - Re-encoding fails
    pub async fn capture_file<P: AsRef<Path>>(
        path: P,
        options: &CaptureOptions,
    ) -> Result<ImagePayload, CaptureError> {
        let path_ref = path.as_ref();
        let bytes = tokio::fs::read(path_ref).await?;
        log::debug!("Read {} bytes from {}", bytes.len(), path_ref.display());
        Self::capture_bytes(&bytes, options)
    }

    /// Capture an image held in memory
    ///
    /// # Examples
    /// ```rust,no_run
    /// use photo_genius::services::{CaptureOptions, ImageCaptureService};
    ///
    /// # fn example(upload: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
    /// let payload = ImageCaptureService::capture_bytes(&upload, &CaptureOptions::default())?;
    /// assert!(payload.as_str().starts_with("data:image/jpeg;base64,"));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// - The input is empty or not a decodable image
    /// - The target encoder is unavailable or fails
    pub fn capture_bytes(
        bytes: &[u8],
        options: &CaptureOptions,
    ) -> Result<ImagePayload, CaptureError> {
        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }

        let bitmap = image::load_from_memory(bytes).map_err(CaptureError::Decode)?;
        let (width, height) = bitmap.dimensions();
        log::debug!("Decoded {}x{} bitmap", width, height);

        let encoded = Self::encode(&bitmap, options)?;
        let mime_type = CaptureFormatHandler::mime_type(options.format);
        log::debug!(
            "Re-encoded {}x{} bitmap as {} ({} bytes)",
            width,
            height,
            mime_type,
            encoded.len()
        );

        Ok(ImagePayload::from_bytes(mime_type, &encoded))
    }

    /// Re-encode a decoded bitmap at its natural size
    ///
    /// # Errors
    /// - The target encoder is unavailable or fails
    pub fn encode(bitmap: &DynamicImage, options: &CaptureOptions) -> Result<Vec<u8>, CaptureError> {
        if !CaptureFormatHandler::is_available(options.format) {
            return Err(CaptureError::UnsupportedFormat(options.format.to_string()));
        }

        let surface = CaptureFormatHandler::prepare_surface(bitmap, options.format);
        let mut buffer = Cursor::new(Vec::new());

        match options.format {
            CaptureFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, options.jpeg_quality.min(100));
                surface
                    .write_with_encoder(encoder)
                    .map_err(CaptureError::Encode)?;
            },
            CaptureFormat::Png | CaptureFormat::WebP => {
                surface
                    .write_to(&mut buffer, CaptureFormatHandler::image_format(options.format))
                    .map_err(CaptureError::Encode)?;
            },
        }

        Ok(buffer.into_inner())
    }
}
