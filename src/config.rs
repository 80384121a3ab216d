//! Configuration types for the gateway, the provider client and the client workflow
//!
//! Everything is sourced once at process start and injected at construction
//! time. No component reads the environment per request.

use crate::error::ConfigError;
use crate::services::{CaptureFormat, CaptureOptions};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the provider credential
pub const CREDENTIAL_ENV_VAR: &str = "FAL_KEY";

/// Background-removal model invoked on the provider
pub const DEFAULT_MODEL_ID: &str = "fal-ai/imageutils/rembg";

/// Provider queue endpoint
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

/// Route served by the gateway
pub const REMOVE_BACKGROUND_ROUTE: &str = "/api/remove-background";

/// File name used when saving a processed image
pub const DEFAULT_DOWNLOAD_FILE_NAME: &str = "processed_image.png";

/// Provider credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a credential, treating an empty string as absent
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(Self(value))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Settings for the external provider client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Model identifier, appended to the queue URL
    pub model_id: String,
    /// Base URL of the provider queue API
    pub queue_url: String,
    /// Delay between status polls while a request is queued or running
    pub poll_interval: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl ProviderConfig {
    /// Validate URL and interval
    ///
    /// # Errors
    /// - Empty model id
    /// - Queue URL not http(s)
    /// - Zero poll interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_id.trim().is_empty() {
            return Err(ConfigError::invalid("model id must not be empty"));
        }
        if !(self.queue_url.starts_with("https://") || self.queue_url.starts_with("http://")) {
            return Err(ConfigError::invalid(format!(
                "queue URL must be http(s): {}",
                self.queue_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::out_of_range("poll interval", "0ms", ">= 1ms"));
        }
        Ok(())
    }

    /// Submission endpoint for the configured model
    #[must_use]
    pub fn submit_url(&self) -> String {
        format!(
            "{}/{}",
            self.queue_url.trim_end_matches('/'),
            self.model_id.trim_matches('/')
        )
    }
}

/// Configuration injected into the gateway
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Provider credential, `None` when unset
    pub credential: Option<Credential>,
    /// Provider client settings
    pub provider: ProviderConfig,
}

impl GatewayConfig {
    /// Read the credential from `FAL_KEY` once, with default provider settings
    #[must_use]
    pub fn from_env() -> Self {
        let credential = std::env::var(CREDENTIAL_ENV_VAR)
            .ok()
            .and_then(Credential::new);
        Self {
            credential,
            provider: ProviderConfig::default(),
        }
    }

    #[must_use]
    pub fn with_credential<S: Into<String>>(mut self, credential: S) -> Self {
        self.credential = Credential::new(credential);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted JSON body; photos as data URLs are large
    pub max_payload_bytes: usize,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_payload_bytes: 20 * 1024 * 1024,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// # Errors
    /// - Zero payload limit
    /// - Invalid provider settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::out_of_range(
                "max payload size",
                self.max_payload_bytes,
                ">= 1 byte",
            ));
        }
        self.gateway.provider.validate()
    }
}

/// Configuration for the client workflow (capture, remove, download)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the gateway, e.g. `http://127.0.0.1:3000`
    pub server_url: String,
    /// How selected photos are re-encoded before upload
    pub capture: CaptureOptions,
    /// File name used when saving the processed image
    pub download_file_name: String,
    /// Where temporary download files live (`None` = system temp)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            capture: CaptureOptions::default(),
            download_file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
            scratch_dir: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Full URL of the remove-background route
    #[must_use]
    pub fn remove_background_url(&self) -> String {
        format!(
            "{}{}",
            self.server_url.trim_end_matches('/'),
            REMOVE_BACKGROUND_ROUTE
        )
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - JPEG quality above 100
    /// - Empty server URL or download file name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.jpeg_quality > 100 {
            return Err(ConfigError::out_of_range(
                "JPEG quality",
                self.capture.jpeg_quality,
                "0-100",
            ));
        }
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::invalid("server URL must not be empty"));
        }
        if self.download_file_name.trim().is_empty() {
            return Err(ConfigError::invalid("download file name must not be empty"));
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn server_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.server_url = url.into();
        self
    }

    #[must_use]
    pub fn capture_format(mut self, format: CaptureFormat) -> Self {
        self.config.capture.format = format;
        self
    }

    /// Set JPEG quality, clamped to 100
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.capture.jpeg_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn download_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.download_file_name = name.into();
        self
    }

    #[must_use]
    pub fn scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// # Errors
    /// Returns the first validation failure
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
