//! Error types for capture, gateway and client operations

use crate::types::ErrorBody;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Message returned to callers for every failure that must not leak internals
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to remove background";

/// Message returned when the provider credential was not configured
pub const MISSING_CREDENTIAL_MESSAGE: &str = "FAL_KEY is not set";

/// Message returned when the request carries no usable image
pub const INVALID_IMAGE_MESSAGE: &str = "Invalid image data";

/// Errors produced by the background-removal gateway
///
/// Each variant maps to exactly one HTTP status and one response body, see
/// [`GatewayError::status_code`] and [`GatewayError::to_body`].
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The provider credential is absent from the injected configuration
    #[error("provider credential is not configured")]
    MissingCredential,

    /// The request body parsed, but its `image` field is missing, not a string,
    /// or not an embedded image data URL
    #[error("invalid image data: {details}")]
    InvalidImage { details: String },

    /// The request body is not JSON at all
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// The external provider call failed
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
}

impl GatewayError {
    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(details: S) -> Self {
        Self::InvalidImage {
            details: details.into(),
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidImage { .. } => 422,
            Self::MissingCredential | Self::MalformedBody(_) | Self::Provider(_) => 500,
        }
    }

    /// Client-facing body. Only validation failures carry details.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::MissingCredential => ErrorBody::new(MISSING_CREDENTIAL_MESSAGE),
            Self::InvalidImage { details } => {
                ErrorBody::with_details(INVALID_IMAGE_MESSAGE, details.clone())
            },
            Self::MalformedBody(_) | Self::Provider(_) => ErrorBody::new(GENERIC_FAILURE_MESSAGE),
        }
    }
}

/// Errors raised while talking to the external inference provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider answered with a non-success status
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network or TLS failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with something we could not decode
    #[error("could not decode provider response: {0}")]
    Decode(String),

    /// The queued request finished in a state other than completed
    #[error("request {request_id} ended with status {status}")]
    Failed { request_id: String, status: String },
}

/// Errors raised while turning a user-selected file into an image payload
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Reading the selected file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a decodable image
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Re-encoding the decoded bitmap failed
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The selected file is empty
    #[error("selected file is empty")]
    Empty,

    /// The requested encoder is not compiled in
    #[error("unsupported capture format: {0}")]
    UnsupportedFormat(String),
}

/// Errors raised by the client side of the workflow
#[derive(Error, Debug)]
pub enum ClientError {
    /// The gateway answered with an error body
    #[error("Failed to remove background: {}", describe_gateway_error(.error, .details.as_deref()))]
    Gateway {
        error: String,
        details: Option<String>,
    },

    /// Network failure while talking to the gateway or fetching the result
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered 200 but the result had no `image.url`
    #[error("Provider response did not include a processed image URL")]
    MissingResultUrl,

    /// Fetching the processed image returned a non-success status
    #[error("Download failed with HTTP {status}")]
    Download { status: u16 },

    /// Writing the downloaded image failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The selected file could not be captured
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Errors raised while validating configuration values
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A numeric parameter is outside its valid range
    #[error("Invalid {parameter}: {value} (valid range: {valid_range})")]
    OutOfRange {
        parameter: &'static str,
        value: String,
        valid_range: &'static str,
    },

    /// Any other inconsistent configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a new invalid configuration error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::Invalid(msg.into())
    }

    /// Create an out-of-range error for a parameter
    pub fn out_of_range<T: std::fmt::Display>(
        parameter: &'static str,
        value: T,
        valid_range: &'static str,
    ) -> Self {
        Self::OutOfRange {
            parameter,
            value: value.to_string(),
            valid_range,
        }
    }
}

fn describe_gateway_error(error: &str, details: Option<&str>) -> String {
    match details {
        Some(details) => format!("{error}. Details: {details}"),
        None => error.to_string(),
    }
}
