//! Test utilities and mock collaborators
//!
//! Mock implementations of [`BackgroundRemovalProvider`], [`RemovalService`]
//! and [`AlertSink`] that record every call, so tests can assert how many
//! network operations were issued without touching the network.

use crate::{
    client::RemovalService,
    config::Credential,
    controller::AlertSink,
    error::{ClientError, ProviderError},
    provider::BackgroundRemovalProvider,
    types::{ImagePayload, ProviderInput, RemovalResult},
};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Encode a solid-colour PNG of the given size
#[must_use]
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([30, 144, 255, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    buffer.into_inner()
}

/// Provider mock with call history
#[derive(Debug, Clone)]
pub struct MockProvider {
    response: Option<Value>,
    calls: Arc<Mutex<Vec<(String, ProviderInput)>>>,
}

impl MockProvider {
    /// Provider that answers every call with `response`
    #[must_use]
    pub fn returning(response: Value) -> Self {
        Self {
            response: Some(response),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider whose every call fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            response: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Inputs received, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderInput> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, input)| input.clone())
            .collect()
    }

    /// Credentials received, in order
    #[must_use]
    pub fn credentials(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(credential, _)| credential.clone())
            .collect()
    }
}

#[async_trait]
impl BackgroundRemovalProvider for MockProvider {
    async fn remove_background(
        &self,
        credential: &Credential,
        input: &ProviderInput,
    ) -> Result<Value, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((credential.expose().to_string(), input.clone()));

        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(ProviderError::Http {
                status: 500,
                body: "internal provider failure: stack trace at worker.py:42".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Removal service mock for controller tests
#[derive(Debug, Clone)]
pub struct MockRemovalService {
    removal: Result<Value, (String, Option<String>)>,
    download: Option<Vec<u8>>,
    gate: Option<Arc<Semaphore>>,
    fail_after: Option<usize>,
    remove_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl MockRemovalService {
    /// Service whose removal returns `{ image: { url } }`
    #[must_use]
    pub fn succeeding(url: &str) -> Self {
        Self::returning(json!({ "image": { "url": url } }))
    }

    /// Service whose removal returns `result` verbatim
    #[must_use]
    pub fn returning(result: Value) -> Self {
        Self {
            removal: Ok(result),
            download: Some(b"\x89PNG\r\n\x1a\n".to_vec()),
            gate: None,
            fail_after: None,
            remove_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Service whose removal fails with a gateway error body
    #[must_use]
    pub fn failing(error: &str, details: Option<&str>) -> Self {
        Self {
            removal: Err((error.to_string(), details.map(str::to_string))),
            ..Self::returning(Value::Null)
        }
    }

    /// Succeed for the first `successes` removals, then fail with a generic error
    #[must_use]
    pub fn failing_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }

    #[must_use]
    pub fn with_download(mut self, bytes: Vec<u8>) -> Self {
        self.download = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_failing_download(mut self) -> Self {
        self.download = None;
        self
    }

    /// Hold every network call until a permit is added to the returned semaphore
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    #[must_use]
    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl RemovalService for MockRemovalService {
    async fn remove_background(&self, _image: &ImagePayload) -> Result<RemovalResult, ClientError> {
        let call = self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.fail_after.is_some_and(|successes| call >= successes) {
            return Err(ClientError::Gateway {
                error: "Failed to remove background".to_string(),
                details: None,
            });
        }
        match &self.removal {
            Ok(result) => Ok(RemovalResult::from(result.clone())),
            Err((error, details)) => Err(ClientError::Gateway {
                error: error.clone(),
                details: details.clone(),
            }),
        }
    }

    async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        self.download
            .clone()
            .ok_or(ClientError::Download { status: 404 })
    }
}

/// Alert sink that records messages instead of showing them
#[derive(Debug, Clone, Default)]
pub struct RecordingAlertSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingAlertSink {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
