//! Staged images and the classification upload area.
//!
//! An image is validated (JPEG/PNG, under a per-context size limit) before it
//! is staged. Staging reads the file once and builds a `data:` URL preview;
//! both are reference-counted so view snapshots stay cheap to clone.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, ValidationError};
use crate::types::ClassificationResult;

/// MIME types accepted anywhere an image can be staged.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;

/// Default limit for images sent to `/predict` (10MB).
pub const DEFAULT_CLASSIFY_MAX_BYTES: u64 = 10 * MB;

/// Default limit for images attached to a chat turn (5MB).
pub const DEFAULT_CHAT_IMAGE_MAX_BYTES: u64 = 5 * MB;

/// A byte count shown to the user.
///
/// Whole megabytes print as `10MB`, whole kilobytes as `512KB`, anything else
/// as plain bytes, so a limit is never shown smaller than it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "0 bytes"),
            n if n % MB == 0 => write!(f, "{}MB", n / MB),
            n if n % KB == 0 => write!(f, "{}KB", n / KB),
            n => write!(f, "{n} bytes"),
        }
    }
}

/// Where an image is being staged. Each context has its own size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadContext {
    /// The classification upload area.
    Classify,
    /// The chat image attachment.
    Chat,
}

/// Size limits per upload context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    /// Maximum size for classification images, in bytes.
    pub classify_max_bytes: u64,
    /// Maximum size for chat images, in bytes.
    pub chat_image_max_bytes: u64,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            classify_max_bytes: DEFAULT_CLASSIFY_MAX_BYTES,
            chat_image_max_bytes: DEFAULT_CHAT_IMAGE_MAX_BYTES,
        }
    }
}

impl ImageLimits {
    /// Limit in bytes for a context.
    #[must_use]
    pub fn max_bytes(&self, context: UploadContext) -> u64 {
        match context {
            UploadContext::Classify => self.classify_max_bytes,
            UploadContext::Chat => self.chat_image_max_bytes,
        }
    }

    /// Check type first, then size.
    pub fn validate(
        &self,
        context: UploadContext,
        mime: &str,
        size: u64,
    ) -> std::result::Result<(), ValidationError> {
        if !is_accepted_mime(mime) {
            return Err(ValidationError::UnsupportedType {
                mime: mime.to_string(),
            });
        }

        let limit = self.max_bytes(context);
        if size > limit {
            let limit = ByteSize(limit);
            return Err(match context {
                UploadContext::Classify => ValidationError::FileTooLarge { size, limit },
                UploadContext::Chat => ValidationError::ChatImageTooLarge { size, limit },
            });
        }

        Ok(())
    }
}

/// Whether a MIME type is one of [`ACCEPTED_MIME_TYPES`].
#[must_use]
pub fn is_accepted_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    ACCEPTED_MIME_TYPES
        .iter()
        .any(|accepted| essence.eq_ignore_ascii_case(accepted))
}

/// An image selected but not yet submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    file_name: String,
    mime: String,
    bytes: Arc<[u8]>,
    preview: Arc<str>,
}

impl StagedImage {
    /// Stage in-memory image data. No validation happens here.
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime = mime.into();
        let preview = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
        Self {
            file_name: file_name.into(),
            mime,
            bytes: Arc::from(bytes),
            preview: Arc::from(preview),
        }
    }

    /// Validate and read an image from disk.
    ///
    /// The MIME type is guessed from the file extension. Type and size are
    /// checked against `limits` before the contents are read.
    pub async fn open(
        path: impl AsRef<Path>,
        context: UploadContext,
        limits: &ImageLimits,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let metadata = tokio::fs::metadata(path).await?;
        limits.validate(context, &mime, metadata.len())?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        tracing::debug!(
            name: "hub.upload.staged",
            file = %file_name,
            mime = %mime,
            size = bytes.len(),
            "Image read from disk"
        );

        Ok(Self::new(file_name, mime, bytes))
    }

    /// Original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Raw file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `data:` URL used as the local preview.
    #[must_use]
    pub fn preview_url(&self) -> Arc<str> {
        Arc::clone(&self.preview)
    }
}

/// Coarse phase of the upload area, for rendering and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Nothing staged; the drop zone is shown.
    Empty,
    /// An image is staged and previewed.
    Previewing,
    /// The staged image has a classification result.
    Classified,
}

/// The classification upload area.
///
/// `Empty -> Previewing -> Classified`. Selecting a new image from any
/// phase returns to `Previewing`; only an explicit reset returns to `Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UploadArea {
    /// Nothing staged.
    #[default]
    Empty,
    /// Image staged, no result yet.
    Previewing(StagedImage),
    /// Image staged and classified.
    Classified {
        /// The image that was classified.
        image: StagedImage,
        /// The server's answer.
        result: ClassificationResult,
    },
}

impl UploadArea {
    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> UploadPhase {
        match self {
            Self::Empty => UploadPhase::Empty,
            Self::Previewing(_) => UploadPhase::Previewing,
            Self::Classified { .. } => UploadPhase::Classified,
        }
    }

    /// Stage a new image, replacing whatever was there.
    pub fn stage(&mut self, image: StagedImage) {
        *self = Self::Previewing(image);
    }

    /// The staged image, if any.
    #[must_use]
    pub fn staged(&self) -> Option<&StagedImage> {
        match self {
            Self::Empty => None,
            Self::Previewing(image) | Self::Classified { image, .. } => Some(image),
        }
    }

    /// The classification result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Classified { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Attach a result to the staged image. Ignored when nothing is staged.
    pub fn classified(&mut self, result: ClassificationResult) {
        if let Some(image) = self.staged().cloned() {
            *self = Self::Classified { image, result };
        }
    }

    /// Drop any result but keep the staged image.
    pub fn clear_result(&mut self) {
        if let Self::Classified { image, .. } = self {
            *self = Self::Previewing(image.clone());
        }
    }

    /// Return to `Empty`.
    pub fn reset(&mut self) {
        *self = Self::Empty;
    }
}
