//! The client controller.
//!
//! [`ClientController`] owns the view-model and a [`HubApi`]. Each operation
//! validates its input, issues at most one request, and updates the view.
//! After every visible change a snapshot is published on a `watch` channel so
//! a renderer on another task sees intermediate states (loading, thinking).
//!
//! Operations take `&mut self`, so a single controller never has two
//! requests in flight.

use std::path::Path;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::chat::{APOLOGY_TEXT, ChatState, IMAGE_ONLY_TEXT};
use crate::client::{ChatTurn, HubApi};
use crate::error::{Error, Result, ValidationError};
use crate::session::SessionId;
use crate::types::{ChatReply, ClassificationResult, SentimentResult};
use crate::upload::{ImageLimits, StagedImage, UploadContext};
use crate::view::{Notification, ServerStatus, SentimentView, ViewState};

/// Failure toast for `/predict`.
pub const CLASSIFY_FAILED: &str = "Classification failed. Please try again.";
/// Failure toast for `/sentiment_analysis`.
pub const SENTIMENT_FAILED: &str = "Sentiment analysis failed. Please try again.";
/// Failure toast for `/chat`.
pub const CHAT_FAILED: &str = "Chat request failed. Please try again.";
/// Success toast for a history delete.
pub const HISTORY_CLEARED: &str = "Conversation history cleared";
/// Failure toast for a history delete.
pub const HISTORY_CLEAR_FAILED: &str = "Failed to clear history";

/// How a controller is built.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Whether the chat capability is present.
    pub chat_enabled: bool,
    /// Upload size limits.
    pub limits: ImageLimits,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            chat_enabled: true,
            limits: ImageLimits::default(),
        }
    }
}

/// Front-end controller over a [`HubApi`].
///
/// # Example
///
/// ```rust,no_run
/// use multimodal_hub::client::HubClient;
/// use multimodal_hub::controller::{ClientController, ControllerOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = HubClient::new("http://localhost:8000")?;
/// let mut controller = ClientController::new(api, ControllerOptions::default());
/// controller.load().await;
/// controller.send_chat_message("Hello!").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClientController<A> {
    api: A,
    limits: ImageLimits,
    state: ViewState,
    updates: watch::Sender<ViewState>,
}

impl<A: HubApi> ClientController<A> {
    /// Create a controller. No request is made until [`load`](Self::load).
    pub fn new(api: A, options: ControllerOptions) -> Self {
        let state = ViewState {
            chat: options.chat_enabled.then(ChatState::new),
            ..ViewState::default()
        };
        let (updates, _) = watch::channel(state.clone());
        Self {
            api,
            limits: options.limits,
            state,
            updates,
        }
    }

    /// The underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Upload size limits in effect.
    pub fn limits(&self) -> &ImageLimits {
        &self.limits
    }

    /// Current view state.
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Subscribe to view snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.updates.subscribe()
    }

    /// Remove and return pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let taken = std::mem::take(&mut self.state.notifications);
        self.publish();
        taken
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Start-up and health
    // ─────────────────────────────────────────────────────────────────────────

    /// Page-load sequence: probe health, then open a chat session.
    pub async fn load(&mut self) {
        self.check_health().await;
        if self.state.chat.is_some() {
            // Chat is present, so this cannot fail.
            let _ = self.init_new_session();
        }
    }

    /// Probe `/health` and record the result. Never retries.
    pub async fn check_health(&mut self) -> ServerStatus {
        let status = match self.api.health().await {
            Ok(_) => ServerStatus::Online,
            Err(e) => {
                warn!(name: "hub.health.failed", error = %e, "Server status check failed");
                ServerStatus::Offline
            }
        };
        self.state.status = status;
        self.publish();
        status
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image classification
    // ─────────────────────────────────────────────────────────────────────────

    /// Stage an image for classification.
    pub fn select_image(&mut self, image: StagedImage) -> Result<()> {
        if let Err(e) = self
            .limits
            .validate(UploadContext::Classify, image.mime(), image.size())
        {
            return Err(self.reject(e));
        }
        self.state.upload.stage(image);
        self.publish();
        Ok(())
    }

    /// Read an image from disk and stage it for classification.
    pub async fn select_image_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match StagedImage::open(path, UploadContext::Classify, &self.limits).await {
            Ok(image) => self.select_image(image),
            Err(e) => Err(self.surface_local(path, e)),
        }
    }

    /// Confirmed reset of the upload area.
    pub fn reset_upload(&mut self) {
        self.state.upload.reset();
        self.publish();
    }

    /// Send the staged image to `/predict`.
    pub async fn classify_image(&mut self) -> Result<ClassificationResult> {
        let Some(image) = self.state.upload.staged().cloned() else {
            return Err(self.reject(ValidationError::NoImageSelected));
        };

        self.set_loading(true);
        let outcome = self.api.classify(&image).await;
        self.state.loading = false;

        match outcome {
            Ok(result) => {
                info!(
                    name: "hub.classify.succeeded",
                    file = %image.file_name(),
                    predicted_class = %result.predicted_class,
                    confidence = result.confidence,
                    "Image classified"
                );
                self.state.upload.classified(result.clone());
                self.publish();
                Ok(result)
            }
            Err(e) => {
                warn!(name: "hub.classify.failed", error = %e, "Classification error");
                self.state.upload.clear_result();
                self.state.notifications.push(Notification::error(CLASSIFY_FAILED));
                self.publish();
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sentiment
    // ─────────────────────────────────────────────────────────────────────────

    /// Analyze the trimmed `text`.
    pub async fn analyze_sentiment(&mut self, text: &str) -> Result<SentimentResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(ValidationError::EmptyText));
        }

        self.set_loading(true);
        let outcome = self.api.analyze_sentiment(text).await;
        self.state.loading = false;

        match outcome {
            Ok(result) => {
                info!(
                    name: "hub.sentiment.succeeded",
                    label = %result.sentiment.label,
                    score = result.sentiment.score,
                    "Sentiment analyzed"
                );
                self.state.sentiment = Some(SentimentView::from(&result));
                self.publish();
                Ok(result)
            }
            Err(e) => {
                warn!(name: "hub.sentiment.failed", error = %e, "Sentiment analysis error");
                self.state.sentiment = None;
                self.state.notifications.push(Notification::error(SENTIMENT_FAILED));
                self.publish();
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chat
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a new session and reset the transcript. Server state is untouched.
    pub fn init_new_session(&mut self) -> Result<SessionId> {
        let chat = self.chat_mut()?;
        let id = chat.start_session(SessionId::generate()).clone();
        info!(name: "hub.chat.session_started", session_id = %id, "New chat session");
        self.publish();
        Ok(id)
    }

    /// Continue an existing session, e.g. one passed on the command line.
    pub fn resume_session(&mut self, id: SessionId) -> Result<()> {
        self.chat_mut()?.resume_session(id);
        self.publish();
        Ok(())
    }

    /// Delete the server-side history, then start a new session.
    ///
    /// On failure the current session is kept so the user can retry.
    pub async fn clear_history(&mut self) -> Result<()> {
        let Some(session) = self.chat_mut()?.session().cloned() else {
            return Ok(());
        };

        match self.api.clear_history(session.as_str()).await {
            Ok(_) => {
                info!(name: "hub.chat.history_cleared", session_id = %session, "History cleared");
                self.state.notifications.push(Notification::success(HISTORY_CLEARED));
                self.init_new_session()?;
                Ok(())
            }
            Err(e) => {
                warn!(name: "hub.chat.clear_failed", session_id = %session, error = %e, "Error clearing history");
                self.state.notifications.push(Notification::error(HISTORY_CLEAR_FAILED));
                self.publish();
                Err(e)
            }
        }
    }

    /// Stage an image for the next chat turn.
    pub fn stage_chat_image(&mut self, image: StagedImage) -> Result<()> {
        self.chat_mut()?;
        if let Err(e) = self
            .limits
            .validate(UploadContext::Chat, image.mime(), image.size())
        {
            return Err(self.reject(e));
        }
        self.chat_mut()?.stage_image(image);
        self.publish();
        Ok(())
    }

    /// Read an image from disk and stage it for the next chat turn.
    pub async fn stage_chat_image_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.chat_mut()?;
        let path = path.as_ref();
        match StagedImage::open(path, UploadContext::Chat, &self.limits).await {
            Ok(image) => self.stage_chat_image(image),
            Err(e) => Err(self.surface_local(path, e)),
        }
    }

    /// Drop the staged chat image.
    pub fn remove_chat_image(&mut self) -> Result<()> {
        self.chat_mut()?.remove_image();
        self.publish();
        Ok(())
    }

    /// Send one chat turn.
    ///
    /// The user bubble is appended before the request; the thinking indicator
    /// is shown while it is in flight. The staged image is consumed either way.
    pub async fn send_chat_message(&mut self, message: &str) -> Result<ChatReply> {
        let text = message.trim();
        let chat = self.chat_mut()?;
        if text.is_empty() && chat.staged_image().is_none() {
            return Err(self.reject(ValidationError::EmptyMessage));
        }

        let session = chat.ensure_session();
        let image = chat.remove_image();
        let bubble = if text.is_empty() { IMAGE_ONLY_TEXT } else { text };
        chat.push_user(bubble, image.as_ref());
        chat.set_thinking(true);
        self.publish();

        let outcome = self
            .api
            .chat(ChatTurn {
                message: text,
                session_id: session.as_str(),
                image: image.as_ref(),
            })
            .await;

        let chat = self.chat_mut()?;
        chat.set_thinking(false);
        match outcome {
            Ok(reply) => {
                chat.push_assistant(reply.response.as_str());
                chat.show_session_label(&reply.session_id);
                info!(
                    name: "hub.chat.replied",
                    session_id = %reply.session_id,
                    conversation_length = reply.conversation_length,
                    model = reply.model_used.as_deref().unwrap_or("unknown"),
                    "Chat reply received"
                );
                self.publish();
                Ok(reply)
            }
            Err(e) => {
                chat.push_assistant(APOLOGY_TEXT);
                warn!(name: "hub.chat.failed", session_id = %session, error = %e, "Chat error");
                self.state.notifications.push(Notification::error(CHAT_FAILED));
                self.publish();
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn chat_mut(&mut self) -> Result<&mut ChatState> {
        self.state.chat.as_mut().ok_or(Error::ChatDisabled)
    }

    fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
        self.publish();
    }

    /// Surface a validation error as a toast and hand it back.
    fn reject(&mut self, error: ValidationError) -> Error {
        self.state
            .notifications
            .push(Notification::error(error.to_string()));
        self.publish();
        Error::Validation(error)
    }

    /// Surface an error from opening a local file.
    fn surface_local(&mut self, path: &Path, error: Error) -> Error {
        match error {
            Error::Validation(e) => self.reject(e),
            other => {
                warn!(name: "hub.upload.read_failed", path = %path.display(), error = %other, "Could not read image");
                self.state.notifications.push(Notification::error(format!(
                    "Could not read {}: {other}",
                    path.display()
                )));
                self.publish();
                other
            }
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }
}
