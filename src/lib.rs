#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Photo Genius
//!
//! Upload a photo, strip its background through a hosted inference
//! provider, preview the result and save it locally.
//!
//! The crate has two halves:
//!
//! - **Gateway** ([`gateway`], [`server`]): a stateless HTTP endpoint,
//!   `POST /api/remove-background`, that validates a Data URL image, attaches
//!   the provider credential and relays the provider result verbatim.
//! - **Client** ([`services`], [`client`], [`controller`]): captures a local
//!   image as a Data URL, sends it to the gateway and drives the
//!   upload → remove → download workflow as a single state machine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_genius::{ClientConfig, remove_background_from_bytes};
//!
//! # async fn example(photo: Vec<u8>) -> anyhow::Result<()> {
//! let config = ClientConfig::builder()
//!     .server_url("http://127.0.0.1:3000")
//!     .build()?;
//! let result = remove_background_from_bytes(&photo, &config).await?;
//! println!("{:?}", result.image_url());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `server` (default): actix-web gateway
//! - `cli` (default): `photo-genius` binary with `serve` and `remove` commands
//! - `webp-support` (default): WebP capture encoding
//! - `tracing-json`, `tracing-files` (default): `--log-format json` and `--log-file` for the binary

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod provider;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod test_utils;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use tokio::io::AsyncRead;

pub use client::{HttpGatewayClient, RemovalService};
pub use config::{ClientConfig, ClientConfigBuilder, Credential, GatewayConfig, ProviderConfig, ServerConfig};
pub use controller::{
    ActionOutcome, AlertSink, ControllerState, LogAlertSink, PresentationController, ProcessedImage,
};
pub use error::{CaptureError, ClientError, ConfigError, GatewayError, ProviderError};
pub use gateway::RemovalGateway;
pub use provider::{BackgroundRemovalProvider, FalProvider};
pub use services::{CaptureFormat, CaptureFormatHandler, CaptureOptions, ImageCaptureService};
pub use types::{ErrorBody, ImagePayload, RemovalRequest, RemovalResult};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat, TracingOutput};

/// Capture raw image bytes and send them through the gateway in `config`
///
/// One-shot variant of [`PresentationController::remove_background`] without
/// any UI state or alerts.
///
/// # Errors
/// - The bytes are not a decodable image
/// - Transport failures or gateway error responses
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &ClientConfig,
) -> Result<RemovalResult, ClientError> {
    let payload = ImageCaptureService::capture_bytes(image_bytes, &config.capture)?;
    let client = HttpGatewayClient::new(config)?;
    client.remove_background(&payload).await
}

/// Read an image from an async stream and send it through the gateway
///
/// # Errors
/// See [`remove_background_from_bytes`]; read failures surface as I/O errors.
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &ClientConfig,
) -> Result<RemovalResult, ClientError> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
    remove_background_from_bytes(&buffer, config).await
}
