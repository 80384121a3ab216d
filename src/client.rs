//! Client for the gateway route and for fetching processed images

use crate::{
    config::ClientConfig,
    error::ClientError,
    types::{ErrorBody, ImagePayload, RemovalRequest, RemovalResult},
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Network operations the presentation controller depends on
#[async_trait]
pub trait RemovalService: Send + Sync {
    /// Send an image to the gateway and return the relayed provider result
    ///
    /// # Errors
    /// - Transport failures
    /// - Gateway error responses
    async fn remove_background(&self, image: &ImagePayload) -> Result<RemovalResult, ClientError>;

    /// Fetch the bytes of a processed image
    ///
    /// # Errors
    /// - Transport failures or non-success status
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}

/// reqwest-backed client for `POST /api/remove-background`
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    client: Client,
    endpoint: String,
}

impl HttpGatewayClient {
    /// Create a client for the gateway configured in `config`
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: config.remove_background_url(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemovalService for HttpGatewayClient {
    async fn remove_background(&self, image: &ImagePayload) -> Result<RemovalResult, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RemovalRequest::from(image))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(gateway_error(status.as_u16(), &body));
        }

        let result: RemovalResult = response.json().await?;
        debug!(result = %result.as_value(), "API response");
        Ok(result)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        if let Some(bytes) = ImagePayload::from_data_url(url).and_then(|p| p.decode_bytes()) {
            return Ok(bytes);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Download {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Build a client error from a non-success gateway response
fn gateway_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error, details }) => ClientError::Gateway { error, details },
        Err(_) => ClientError::Gateway {
            error: format!("HTTP {status}"),
            details: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_from_json_body() {
        let err = gateway_error(
            422,
            r#"{"error":"Invalid image data","details":"Image data must be a valid Data URL"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Failed to remove background: Invalid image data. Details: Image data must be a valid Data URL"
        );
    }

    #[test]
    fn test_gateway_error_from_opaque_body() {
        let err = gateway_error(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "Failed to remove background: HTTP 502");
    }

    #[test]
    fn test_endpoint() {
        let config = ClientConfig::builder()
            .server_url("http://localhost:3000/")
            .build()
            .unwrap();
        let client = HttpGatewayClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/api/remove-background");
    }

    #[tokio::test]
    async fn test_fetch_data_url_without_network() {
        let client = HttpGatewayClient::new(&ClientConfig::default()).unwrap();
        let bytes = client
            .fetch_image("data:image/png;base64,iVBORw0K")
            .await
            .unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}
