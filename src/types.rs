//! Wire types for the hub endpoints.
//!
//! Required fields mirror what the front end reads; the optional ones are
//! extras some servers send and are kept for logging and the CLI.

use serde::{Deserialize, Serialize};

// =============================================================================
// Health
// =============================================================================

/// Body of `GET /health`. Only the status code matters; the body is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthResponse {
    /// Free-form status message.
    #[serde(default)]
    pub msg: Option<String>,
    /// Server-reported status word.
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Image classification
// =============================================================================

/// Response from `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted label, with underscores as word separators.
    pub predicted_class: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Name of the uploaded file, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

// =============================================================================
// Sentiment
// =============================================================================

/// Label and score for a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Label such as `POSITIVE` or `negative`.
    pub label: String,
    /// Score in `[0, 1]`.
    pub score: f64,
}

/// Response from `GET /sentiment_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// The sentiment itself.
    pub sentiment: Sentiment,
    /// The analyzed text, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// =============================================================================
// Chat
// =============================================================================

/// Response from `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant text.
    pub response: String,
    /// Session the turn was recorded under.
    pub session_id: String,
    /// Number of messages the server holds for the session.
    pub conversation_length: usize,
    /// Whether the server saw an image with this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    /// Model the server used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

/// Response from `DELETE /chat/history/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearHistoryResponse {
    /// Confirmation text.
    #[serde(default)]
    pub message: Option<String>,
}

/// One content part of a stored turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HistoryContent {
    /// Text part.
    Text {
        /// The text.
        text: String,
    },
    /// Image placeholder; the server does not send the pixels back.
    Image,
}

/// A stored turn, as returned by `GET /chat/history/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// `user` or `assistant`.
    pub role: String,
    /// Content parts in order.
    #[serde(default)]
    pub content: Vec<HistoryContent>,
}

/// Response from `GET /chat/history/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    /// Stored turns, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    /// Number of stored turns.
    #[serde(default)]
    pub length: usize,
}

/// Response from `GET /chat/sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    /// Session ids with history on the server.
    #[serde(default)]
    pub active_sessions: Vec<String>,
    /// Number of sessions.
    #[serde(default)]
    pub total_sessions: usize,
}
