//! Core data types: the embedded image payload and the provider result

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix every accepted image payload must start with
pub const DATA_URL_IMAGE_PREFIX: &str = "data:image";

/// An encoded raster image carried as a self-contained `data:` URL
///
/// The payload is immutable once built. A new upload produces a new payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data_url: String,
}

impl ImagePayload {
    /// Build a payload from a MIME type and raw encoded bytes
    #[must_use]
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            data_url: format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)),
        }
    }

    /// Wrap an existing data URL string, checking only the image prefix
    ///
    /// Returns `None` when the string does not declare an image MIME type.
    #[must_use]
    pub fn from_data_url<S: Into<String>>(data_url: S) -> Option<Self> {
        let data_url = data_url.into();
        has_image_prefix(&data_url).then_some(Self { data_url })
    }

    /// The full data URL
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.data_url
    }

    /// MIME type declared in the data URL header, e.g. `image/jpeg`
    #[must_use]
    pub fn mime_type(&self) -> &str {
        let header = self.header();
        let without_scheme = header.strip_prefix("data:").unwrap_or(header);
        without_scheme
            .split(';')
            .next()
            .unwrap_or(without_scheme)
    }

    /// Decode the base64 body back into encoded image bytes
    ///
    /// Returns `None` if the payload is not base64 encoded or the body is corrupt.
    #[must_use]
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        let (header, body) = self.data_url.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        STANDARD.decode(body).ok()
    }

    /// Length of the data URL in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_url.len()
    }

    /// Whether the data URL is empty (never true for a built payload)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_url.is_empty()
    }

    /// Short prefix suitable for logging
    #[must_use]
    pub fn preview(&self) -> &str {
        preview(&self.data_url)
    }

    fn header(&self) -> &str {
        self.data_url
            .split_once(',')
            .map_or(self.data_url.as_str(), |(header, _)| header)
    }
}

impl fmt::Display for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data_url)
    }
}

/// Whether a string starts with the embedded image data URL prefix
#[must_use]
pub fn has_image_prefix(value: &str) -> bool {
    value.starts_with(DATA_URL_IMAGE_PREFIX)
}

/// First 100 characters of a string, for request logging
#[must_use]
pub fn preview(value: &str) -> &str {
    match value.char_indices().nth(100) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Body of `POST /api/remove-background`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalRequest {
    pub image: String,
}

impl From<&ImagePayload> for RemovalRequest {
    fn from(payload: &ImagePayload) -> Self {
        Self {
            image: payload.as_str().to_string(),
        }
    }
}

/// Input sent to the provider's background-removal operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInput {
    pub image_url: String,
}

/// Opaque provider response, relayed verbatim
///
/// Only `image.url` is ever read by this crate; every other field is provider
/// defined and left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemovalResult(pub Value);

impl RemovalResult {
    /// Reference to the processed image, if the provider returned one
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.0.get("image")?.get("url")?.as_str()
    }

    /// The raw provider structure
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for RemovalResult {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// JSON error body returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details<S: Into<String>, D: Into<String>>(error: S, details: D) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
