//! Image services used by the client side of the workflow

pub mod capture;
pub mod format;

pub use capture::{CaptureOptions, ImageCaptureService, DEFAULT_JPEG_QUALITY};
pub use format::{CaptureFormat, CaptureFormatHandler};
