//! Background-removal gateway
//!
//! Validates an incoming request, checks the injected credential and forwards
//! the image to the provider. The provider response is relayed verbatim.
//! Every failure is returned as a typed [`GatewayError`]; the HTTP layer only
//! chooses a status code and body from it.

use crate::{
    config::GatewayConfig,
    error::{GatewayError, ProviderError, Result},
    provider::{BackgroundRemovalProvider, FalProvider},
    types::{has_image_prefix, preview, ProviderInput, RemovalResult},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Details returned when the `image` field is missing
pub const MISSING_IMAGE_DETAILS: &str = "Request body must contain an `image` field";

/// Details returned when the `image` field is not a string
pub const NON_STRING_IMAGE_DETAILS: &str = "Image data must be a string";

/// Details returned when the image is not an embedded image data URL
pub const INVALID_DATA_URL_DETAILS: &str = "Image data must be a valid Data URL";

/// Stateless request handler shared by all incoming requests
#[derive(Clone)]
pub struct RemovalGateway {
    config: GatewayConfig,
    provider: Arc<dyn BackgroundRemovalProvider>,
}

impl std::fmt::Debug for RemovalGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovalGateway")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl RemovalGateway {
    /// Create a gateway around any provider
    #[must_use]
    pub fn new(config: GatewayConfig, provider: Arc<dyn BackgroundRemovalProvider>) -> Self {
        Self { config, provider }
    }

    /// Create a gateway backed by the hosted queue provider
    ///
    /// # Errors
    /// - Failed to create the provider HTTP client
    pub fn with_fal(config: GatewayConfig) -> std::result::Result<Self, ProviderError> {
        let provider = FalProvider::new(config.provider.clone())?;
        Ok(Self::new(config, Arc::new(provider)))
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle a raw request body
    ///
    /// Order of checks: the body must be JSON, the credential must be set, the
    /// image must be valid. Only then is the provider called, exactly once.
    ///
    /// # Errors
    /// - [`GatewayError::MalformedBody`] when the body is not JSON
    /// - [`GatewayError::MissingCredential`] when no credential was injected
    /// - [`GatewayError::InvalidImage`] for a missing, non-string or non-image field
    /// - [`GatewayError::Provider`] when the provider call fails
    #[instrument(skip_all, fields(body_len = body.len()))]
    pub async fn handle_body(&self, body: &[u8]) -> Result<RemovalResult> {
        let request: Value = serde_json::from_slice(body).map_err(|e| {
            error!(error = %e, "Request body is not valid JSON");
            GatewayError::MalformedBody(e.to_string())
        })?;
        self.handle(&request).await
    }

    /// Handle an already-parsed JSON request
    ///
    /// # Errors
    /// See [`RemovalGateway::handle_body`].
    pub async fn handle(&self, request: &Value) -> Result<RemovalResult> {
        let Some(credential) = self.config.credential.as_ref() else {
            error!("FAL_KEY is not set");
            return Err(GatewayError::MissingCredential);
        };

        let image = Self::validate(request).map_err(|e| {
            error!(error = %e, "Invalid image data received");
            e
        })?;
        info!(image = %preview(image), "Image data received");

        info!(provider = self.provider.name(), "Calling background removal provider");
        let input = ProviderInput {
            image_url: image.to_string(),
        };
        match self.provider.remove_background(credential, &input).await {
            Ok(result) => {
                info!("Background removal provider call successful");
                Ok(RemovalResult::from(result))
            },
            Err(e) => {
                error!(error = ?e, "Background removal provider call failed");
                Err(GatewayError::Provider(e))
            },
        }
    }

    /// Extract the image string from a request, rejecting anything but an
    /// embedded image data URL
    ///
    /// # Errors
    /// - [`GatewayError::InvalidImage`] with a human-readable detail
    pub fn validate(request: &Value) -> Result<&str> {
        let image = match request.get("image") {
            None | Some(Value::Null) => return Err(GatewayError::invalid_image(MISSING_IMAGE_DETAILS)),
            Some(Value::String(image)) => image.as_str(),
            Some(_) => return Err(GatewayError::invalid_image(NON_STRING_IMAGE_DETAILS)),
        };

        if !has_image_prefix(image) {
            return Err(GatewayError::invalid_image(INVALID_DATA_URL_DETAILS));
        }
        Ok(image)
    }
}
