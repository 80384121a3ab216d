//! External background-removal provider
//!
//! The provider is an opaque inference service. [`BackgroundRemovalProvider`]
//! is the seam the gateway depends on; [`FalProvider`] speaks the hosted queue
//! protocol: submit, poll the status URL until the request completes, then
//! fetch the result. No local timeout or retry is applied.

use crate::{
    config::{Credential, ProviderConfig},
    error::ProviderError,
    types::ProviderInput,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

/// Trait for background-removal providers
#[async_trait]
pub trait BackgroundRemovalProvider: Send + Sync {
    /// Run background removal for one image and return the raw provider result
    ///
    /// # Errors
    /// - Transport failures
    /// - Non-success responses from the provider
    /// - Undecodable provider responses
    async fn remove_background(
        &self,
        credential: &Credential,
        input: &ProviderInput,
    ) -> Result<Value, ProviderError>;

    /// Human-readable provider name for logs
    fn name(&self) -> &str;
}

/// Response to a queue submission
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QueueSubmission {
    pub request_id: String,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Status reported while polling a queued request
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QueueStatus {
    pub status: String,
    #[serde(default)]
    pub queue_position: Option<u64>,
}

impl QueueStatus {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.status.as_str(), "IN_QUEUE" | "IN_PROGRESS")
    }
}

/// Hosted queue client for the background-removal model
#[derive(Debug, Clone)]
pub struct FalProvider {
    client: Client,
    config: ProviderConfig,
}

impl FalProvider {
    /// Create a provider client
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Create a provider client sharing an existing HTTP client
    #[must_use]
    pub fn with_client(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Request URL for a queued request, used when the submission omits one
    ///
    /// The queue addresses requests by application (`owner/app`), not by the
    /// full model path.
    #[must_use]
    pub fn request_url(&self, request_id: &str) -> String {
        let app_id: Vec<&str> = self
            .config
            .model_id
            .trim_matches('/')
            .split('/')
            .take(2)
            .collect();
        format!(
            "{}/{}/requests/{}",
            self.config.queue_url.trim_end_matches('/'),
            app_id.join("/"),
            request_id
        )
    }

    fn status_url(&self, submission: &QueueSubmission) -> String {
        submission
            .status_url
            .clone()
            .unwrap_or_else(|| format!("{}/status", self.request_url(&submission.request_id)))
    }

    fn response_url(&self, submission: &QueueSubmission) -> String {
        submission
            .response_url
            .clone()
            .unwrap_or_else(|| self.request_url(&submission.request_id))
    }

    async fn submit(
        &self,
        credential: &Credential,
        input: &ProviderInput,
    ) -> Result<QueueSubmission, ProviderError> {
        let response = self
            .client
            .post(self.config.submit_url())
            .header(reqwest::header::AUTHORIZATION, authorization(credential))
            .json(input)
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }

    async fn wait_for_completion(
        &self,
        credential: &Credential,
        submission: &QueueSubmission,
    ) -> Result<(), ProviderError> {
        let status_url = self.status_url(submission);
        loop {
            let response = self
                .client
                .get(&status_url)
                .header(reqwest::header::AUTHORIZATION, authorization(credential))
                .send()
                .await?;
            let status: QueueStatus = decode(ensure_success(response).await?).await?;
            trace!(
                request_id = %submission.request_id,
                status = %status.status,
                queue_position = ?status.queue_position,
                "Polled provider queue"
            );

            if status.is_completed() {
                return Ok(());
            }
            if !status.is_pending() {
                return Err(ProviderError::Failed {
                    request_id: submission.request_id.clone(),
                    status: status.status,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn fetch_result(
        &self,
        credential: &Credential,
        submission: &QueueSubmission,
    ) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(self.response_url(submission))
            .header(reqwest::header::AUTHORIZATION, authorization(credential))
            .send()
            .await?;
        decode(ensure_success(response).await?).await
    }
}

#[async_trait]
impl BackgroundRemovalProvider for FalProvider {
    async fn remove_background(
        &self,
        credential: &Credential,
        input: &ProviderInput,
    ) -> Result<Value, ProviderError> {
        let submission = self.submit(credential, input).await?;
        debug!(
            request_id = %submission.request_id,
            model = %self.config.model_id,
            "Submitted background removal request"
        );

        self.wait_for_completion(credential, &submission).await?;
        self.fetch_result(credential, &submission).await
    }

    fn name(&self) -> &str {
        "fal"
    }
}

fn authorization(credential: &Credential) -> String {
    format!("Key {}", credential.expose())
}

async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
}
