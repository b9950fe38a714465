//! View-model: everything the front end shows, independent of how it is drawn.
//!
//! The controller mutates a [`ViewState`] and publishes snapshots; the
//! [`render`](crate::render) module turns snapshots into text.

use crate::chat::ChatState;
use crate::types::{ClassificationResult, SentimentResult};
use crate::upload::UploadArea;

/// Reachability of the backend, as last probed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerStatus {
    /// Not probed yet.
    #[default]
    Unknown,
    /// `/health` answered 2xx.
    Online,
    /// `/health` failed or answered non-2xx.
    Offline,
}

impl ServerStatus {
    /// Status line text.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Checking server...",
            Self::Online => "Server Online",
            Self::Offline => "Server Offline",
        }
    }
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// An action completed.
    Success,
    /// An action was rejected or failed.
    Error,
}

/// A transient toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    /// Error toast.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// Success toast.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }
}

/// Format a `[0, 1]` fraction as a percentage with two decimals.
#[must_use]
pub fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Classification panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationView {
    /// Label with underscores replaced by spaces.
    pub label: String,
    /// Confidence as text, e.g. `87.34%`.
    pub confidence: String,
    /// Bar width, same format as `confidence`.
    pub bar_width: String,
}

impl From<&ClassificationResult> for ClassificationView {
    fn from(result: &ClassificationResult) -> Self {
        let pct = percent(result.confidence);
        Self {
            label: result.predicted_class.replace('_', " "),
            confidence: pct.clone(),
            bar_width: pct,
        }
    }
}

/// Sentiment panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentView {
    /// Label in upper case.
    pub label: String,
    /// Lower-case label, used to pick a badge style.
    pub badge: String,
    /// Score with four decimals.
    pub score: String,
    /// Bar width as a percentage.
    pub bar_width: String,
}

impl From<&SentimentResult> for SentimentView {
    fn from(result: &SentimentResult) -> Self {
        let sentiment = &result.sentiment;
        Self {
            label: sentiment.label.to_uppercase(),
            badge: sentiment.label.to_lowercase(),
            score: format!("{:.4}", sentiment.score),
            bar_width: percent(sentiment.score),
        }
    }
}

/// Complete front-end state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Backend reachability.
    pub status: ServerStatus,
    /// Classification upload area (holds the result once classified).
    pub upload: UploadArea,
    /// Last sentiment result.
    pub sentiment: Option<SentimentView>,
    /// Chat panel, present only when chat is enabled.
    pub chat: Option<ChatState>,
    /// Loading overlay for classification and sentiment requests.
    pub loading: bool,
    /// Toasts not yet shown.
    pub notifications: Vec<Notification>,
}

impl ViewState {
    /// Classification panel, if a result is showing.
    #[must_use]
    pub fn classification(&self) -> Option<ClassificationView> {
        self.upload.result().map(ClassificationView::from)
    }
}
