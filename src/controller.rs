//! Presentation controller for the upload → remove → download workflow
//!
//! The whole UI state is one [`ControllerState`] value. Network actions
//! (remove, download) are only accepted from the states that enable them;
//! while one is in flight every other action is a no-op that reports
//! [`ActionOutcome::Ignored`] and issues no request.
//!
//! The state lock is never held across an await point.

use crate::{
    client::RemovalService,
    config::ClientConfig,
    error::{CaptureError, ClientError},
    services::ImageCaptureService,
    types::{ImagePayload, RemovalResult},
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

/// Alert shown when a download fails
pub const DOWNLOAD_FAILED_ALERT: &str = "Failed to download the image. Please try again.";

/// Blocking user notification (a modal alert in a browser, stderr in the CLI)
pub trait AlertSink: Send + Sync {
    fn alert(&self, message: &str);
}

/// Alert sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self, message: &str) {
        error!("{}", message);
    }
}

/// A successful removal: the display source plus the raw provider result
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub url: String,
    pub result: RemovalResult,
}

/// Every state the workflow can be in
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ControllerState {
    /// Nothing uploaded yet
    #[default]
    Idle,
    /// An image was captured and can be sent
    ImageLoaded { original: ImagePayload },
    /// A removal request is in flight. `previous` is restored on failure.
    Processing {
        original: ImagePayload,
        previous: Option<ProcessedImage>,
        full_screen: bool,
    },
    /// A processed image is available
    ResultReady {
        original: ImagePayload,
        processed: ProcessedImage,
        full_screen: bool,
    },
    /// The processed image is being saved
    Downloading {
        original: ImagePayload,
        processed: ProcessedImage,
        full_screen: bool,
    },
}

impl ControllerState {
    /// Whether a network action is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Processing { .. } | Self::Downloading { .. })
    }

    #[must_use]
    pub fn original(&self) -> Option<&ImagePayload> {
        match self {
            Self::Idle => None,
            Self::ImageLoaded { original }
            | Self::Processing { original, .. }
            | Self::ResultReady { original, .. }
            | Self::Downloading { original, .. } => Some(original),
        }
    }

    /// Processed image currently on display
    #[must_use]
    pub fn processed(&self) -> Option<&ProcessedImage> {
        match self {
            Self::Idle | Self::ImageLoaded { .. } => None,
            Self::Processing { previous, .. } => previous.as_ref(),
            Self::ResultReady { processed, .. } | Self::Downloading { processed, .. } => {
                Some(processed)
            },
        }
    }

    #[must_use]
    pub fn is_full_screen(&self) -> bool {
        matches!(
            self,
            Self::ResultReady {
                full_screen: true,
                ..
            } | Self::Downloading {
                full_screen: true,
                ..
            } | Self::Processing {
                full_screen: true,
                ..
            }
        )
    }
}

/// Result of a user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    /// The action ran
    Completed(T),
    /// The control was disabled; nothing happened
    Ignored,
}

impl<T> ActionOutcome<T> {
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Ignored => None,
        }
    }
}

/// Drives the workflow for one session (one page load)
pub struct PresentationController {
    config: ClientConfig,
    service: Arc<dyn RemovalService>,
    alerts: Arc<dyn AlertSink>,
    state: Mutex<ControllerState>,
}

impl PresentationController {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        service: Arc<dyn RemovalService>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            config,
            service,
            alerts,
            state: Mutex::new(ControllerState::Idle),
        }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    /// Remove control: needs an image and no action in flight
    #[must_use]
    pub fn can_remove(&self) -> bool {
        matches!(
            *self.lock(),
            ControllerState::ImageLoaded { .. } | ControllerState::ResultReady { .. }
        )
    }

    /// Download control: needs a result and no action in flight
    #[must_use]
    pub fn can_download(&self) -> bool {
        matches!(*self.lock(), ControllerState::ResultReady { .. })
    }

    /// Full-screen control: needs a result on display
    #[must_use]
    pub fn can_view_full_screen(&self) -> bool {
        self.lock().processed().is_some()
    }

    /// Label of the remove control
    #[must_use]
    pub fn remove_label(&self) -> &'static str {
        if self.is_busy() {
            "Processing..."
        } else {
            "Remove Background"
        }
    }

    /// Label of the download control
    #[must_use]
    pub fn download_label(&self) -> &'static str {
        if self.is_busy() {
            "Downloading..."
        } else {
            "Download"
        }
    }

    /// Capture a file from disk and load it
    ///
    /// # Errors
    /// Capture failures; the state is left unchanged.
    pub async fn load_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<ActionOutcome<()>, CaptureError> {
        if self.is_busy() {
            return Ok(ActionOutcome::Ignored);
        }
        match ImageCaptureService::capture_file(path.as_ref(), &self.config.capture).await {
            Ok(payload) => Ok(self.set_image(payload)),
            Err(e) => {
                warn!(error = %e, path = %path.as_ref().display(), "Could not capture selected file");
                Err(e)
            },
        }
    }

    /// Capture in-memory image bytes and load them
    ///
    /// # Errors
    /// Capture failures; the state is left unchanged.
    pub fn load_image(&self, bytes: &[u8]) -> Result<ActionOutcome<()>, CaptureError> {
        if self.is_busy() {
            return Ok(ActionOutcome::Ignored);
        }
        match ImageCaptureService::capture_bytes(bytes, &self.config.capture) {
            Ok(payload) => Ok(self.set_image(payload)),
            Err(e) => {
                warn!(error = %e, "Could not capture selected image");
                Err(e)
            },
        }
    }

    /// Replace the current image, discarding any previous result
    fn set_image(&self, payload: ImagePayload) -> ActionOutcome<()> {
        let mut state = self.lock();
        if state.is_busy() {
            return ActionOutcome::Ignored;
        }
        info!(bytes = payload.len(), mime = payload.mime_type(), "Image loaded");
        *state = ControllerState::ImageLoaded { original: payload };
        ActionOutcome::Completed(())
    }

    /// Send the loaded image to the gateway
    ///
    /// On failure the user is alerted and the pre-action state is restored.
    ///
    /// # Errors
    /// Gateway, transport or missing-result failures.
    pub async fn remove_background(&self) -> Result<ActionOutcome<ProcessedImage>, ClientError> {
        let original = {
            let mut state = self.lock();
            let next = match &*state {
                ControllerState::ImageLoaded { original } => ControllerState::Processing {
                    original: original.clone(),
                    previous: None,
                    full_screen: false,
                },
                ControllerState::ResultReady {
                    original,
                    processed,
                    full_screen,
                } => ControllerState::Processing {
                    original: original.clone(),
                    previous: Some(processed.clone()),
                    full_screen: *full_screen,
                },
                _ => return Ok(ActionOutcome::Ignored),
            };
            *state = next;
            state.original().cloned()
        };
        let Some(original) = original else {
            return Ok(ActionOutcome::Ignored);
        };

        let outcome = self
            .service
            .remove_background(&original)
            .await
            .and_then(|result| {
                let url = result
                    .image_url()
                    .ok_or(ClientError::MissingResultUrl)?
                    .to_string();
                Ok(ProcessedImage { url, result })
            });

        let mut state = self.lock();
        let (previous, full_screen) = match std::mem::take(&mut *state) {
            ControllerState::Processing {
                previous,
                full_screen,
                ..
            } => (previous, full_screen),
            _ => (None, false),
        };
        match outcome {
            Ok(processed) => {
                info!(url = %processed.url, "Background removed");
                *state = ControllerState::ResultReady {
                    original,
                    processed: processed.clone(),
                    full_screen,
                };
                Ok(ActionOutcome::Completed(processed))
            },
            Err(e) => {
                *state = match previous {
                    Some(processed) => ControllerState::ResultReady {
                        original,
                        processed,
                        full_screen,
                    },
                    None => ControllerState::ImageLoaded { original },
                };
                drop(state);

                error!(error = %e, "Detailed error removing background");
                self.alerts
                    .alert(&format!("Failed to remove background. Error: {e}"));
                Err(e)
            },
        }
    }

    /// Save the processed image into `directory` under the configured file name
    ///
    /// # Errors
    /// See [`PresentationController::download_to`].
    pub async fn download_into<P: AsRef<Path>>(
        &self,
        directory: P,
    ) -> Result<ActionOutcome<PathBuf>, ClientError> {
        let destination = directory.as_ref().join(&self.config.download_file_name);
        self.download_to(destination).await
    }

    /// Fetch the processed image and save it to `destination`
    ///
    /// The bytes are staged in a temporary file that is released afterwards
    /// on both the success and the failure path.
    ///
    /// # Errors
    /// Transport, HTTP or filesystem failures; the user is alerted.
    pub async fn download_to<P: AsRef<Path>>(
        &self,
        destination: P,
    ) -> Result<ActionOutcome<PathBuf>, ClientError> {
        let url = {
            let mut state = self.lock();
            let next = match &*state {
                ControllerState::ResultReady {
                    original,
                    processed,
                    full_screen,
                } => ControllerState::Downloading {
                    original: original.clone(),
                    processed: processed.clone(),
                    full_screen: *full_screen,
                },
                _ => return Ok(ActionOutcome::Ignored),
            };
            *state = next;
            state.processed().map(|p| p.url.clone())
        };
        let Some(url) = url else {
            return Ok(ActionOutcome::Ignored);
        };

        let destination = destination.as_ref().to_path_buf();
        let outcome = match self.service.fetch_image(&url).await {
            Ok(bytes) => self.save_via_temp(&bytes, &destination),
            Err(e) => Err(e),
        };

        {
            let mut state = self.lock();
            if let ControllerState::Downloading {
                original,
                processed,
                full_screen,
            } = std::mem::take(&mut *state)
            {
                *state = ControllerState::ResultReady {
                    original,
                    processed,
                    full_screen,
                };
            }
        }

        match outcome {
            Ok(()) => {
                info!(path = %destination.display(), "Processed image saved");
                Ok(ActionOutcome::Completed(destination))
            },
            Err(e) => {
                error!(error = %e, "Error downloading image");
                self.alerts.alert(DOWNLOAD_FAILED_ALERT);
                Err(e)
            },
        }
    }

    /// Stage bytes in a temporary file, copy it to `destination`, release it
    fn save_via_temp(&self, bytes: &[u8], destination: &Path) -> Result<(), ClientError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("photo-genius-").suffix(".download");
        let mut staged = match &self.config.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let saved = write_and_copy(&mut staged, bytes, destination);
        let released = staged.close();

        saved?;
        released?;
        Ok(())
    }

    /// Open the full-screen preview. Returns whether it is now open.
    pub fn view_full_screen(&self) -> bool {
        let mut state = self.lock();
        match &mut *state {
            ControllerState::ResultReady { full_screen, .. }
            | ControllerState::Downloading { full_screen, .. }
            | ControllerState::Processing {
                previous: Some(_),
                full_screen,
                ..
            } => {
                *full_screen = true;
                true
            },
            _ => false,
        }
    }

    /// Close the full-screen preview
    pub fn close_full_screen(&self) {
        let mut state = self.lock();
        if let ControllerState::ResultReady { full_screen, .. }
        | ControllerState::Downloading { full_screen, .. }
        | ControllerState::Processing { full_screen, .. } = &mut *state
        {
            *full_screen = false;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_and_copy(
    staged: &mut tempfile::NamedTempFile,
    bytes: &[u8],
    destination: &Path,
) -> std::io::Result<()> {
    staged.write_all(bytes)?;
    staged.flush()?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(staged.path(), destination)?;
    Ok(())
}
