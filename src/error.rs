//! Error types for the hub client.

use thiserror::Error;

use crate::upload::ByteSize;

/// Input rejected locally, before any request is issued.
///
/// The `Display` text is exactly what the user is shown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The file is not a JPEG or PNG image.
    #[error("Please select a JPEG or PNG image.")]
    UnsupportedType {
        /// MIME type that was detected.
        mime: String,
    },

    /// A staged classification image is over its limit.
    #[error("File size must be less than {limit}.")]
    FileTooLarge {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Configured limit.
        limit: ByteSize,
    },

    /// A staged chat image is over its limit.
    #[error("Image size must be less than {limit}.")]
    ChatImageTooLarge {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Configured limit.
        limit: ByteSize,
    },

    /// Classification requested with nothing staged.
    #[error("Please select an image first.")]
    NoImageSelected,

    /// Sentiment requested for blank text.
    #[error("Please enter some text to analyze.")]
    EmptyText,

    /// Chat turn with neither text nor a staged image.
    #[error("Please enter a message or select an image.")]
    EmptyMessage,
}

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, or a placeholder if it could not be read.
        message: String,
    },

    /// Input rejected before sending.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A chat operation was called on a controller built without chat.
    #[error("Chat is not enabled for this client")]
    ChatDisabled,
}

impl Error {
    /// Whether the failure happened before anything was sent.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Io(_) | Self::Config(_) | Self::ChatDisabled
        )
    }
}

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, Error>;
