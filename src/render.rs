//! Terminal rendering of view snapshots.
//!
//! Pure functions from [`ViewState`] pieces to strings; nothing here knows
//! about HTTP or the controller.

use std::fmt::Write as _;

use crate::chat::{ChatEntry, ChatState, Role, TranscriptItem, WELCOME_TEXT};
use crate::upload::{ByteSize, ImageLimits, UploadArea, UploadPhase};
use crate::view::{
    ClassificationView, Notification, NotificationLevel, SentimentView, ServerStatus, ViewState,
};

/// Width of progress bars in cells.
pub const BAR_CELLS: usize = 30;

/// Draw a bar filled to `fraction` of [`BAR_CELLS`].
#[must_use]
pub fn bar(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    #[allow(clippy::cast_sign_loss)]
    let filled = (fraction * BAR_CELLS as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_CELLS - filled))
}

/// Parse a `NN.NN%` width back into a fraction.
fn width_fraction(width: &str) -> f64 {
    width
        .trim_end_matches('%')
        .parse::<f64>()
        .map_or(0.0, |pct| pct / 100.0)
}

/// Status line.
#[must_use]
pub fn render_status(status: ServerStatus) -> String {
    let dot = match status {
        ServerStatus::Online => "●",
        ServerStatus::Offline => "○",
        ServerStatus::Unknown => "◌",
    };
    format!("{dot} {}", status.label())
}

/// Upload area: drop-zone hint, preview line, or result.
#[must_use]
pub fn render_upload(upload: &UploadArea, limits: &ImageLimits) -> String {
    match (upload.phase(), upload.staged()) {
        (UploadPhase::Empty, _) | (_, None) => format!(
            "No image selected. Choose a JPEG or PNG (max {}).",
            ByteSize(limits.classify_max_bytes)
        ),
        (phase, Some(image)) => {
            let mut out = format!(
                "Preview: {} ({}, {} bytes)",
                image.file_name(),
                image.mime(),
                image.size()
            );
            if phase == UploadPhase::Classified {
                if let Some(result) = upload.result() {
                    out.push('\n');
                    out.push_str(&render_classification(&ClassificationView::from(result)));
                }
            }
            out
        }
    }
}

/// Classification panel.
#[must_use]
pub fn render_classification(view: &ClassificationView) -> String {
    format!(
        "Predicted class: {}\nConfidence:      {} {}",
        view.label,
        view.confidence,
        bar(width_fraction(&view.bar_width))
    )
}

/// Sentiment panel.
#[must_use]
pub fn render_sentiment(view: &SentimentView) -> String {
    format!(
        "Sentiment: {}\nScore:     {} {}",
        view.label,
        view.score,
        bar(width_fraction(&view.bar_width))
    )
}

/// A toast.
#[must_use]
pub fn render_notification(note: &Notification) -> String {
    let tag = match note.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
    };
    format!("[{tag}] {}", note.message)
}

/// One transcript line.
#[must_use]
pub fn render_item(item: &TranscriptItem) -> String {
    match item {
        TranscriptItem::Welcome { session_id } => {
            format!("🤖 {WELCOME_TEXT}\n   New session started: {session_id}")
        }
        TranscriptItem::Message(entry) => render_entry(entry),
    }
}

fn render_entry(entry: &ChatEntry) -> String {
    let who = match entry.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut out = format!("{} {who}: ", entry.timestamp.format("%H:%M:%S"));
    if entry.image.is_some() {
        out.push_str("[image] ");
    }
    out.push_str(&entry.content);
    out
}

/// Chat header plus the whole transcript.
#[must_use]
pub fn render_chat(chat: &ChatState) -> String {
    let mut out = format!("Session: {}\n", chat.session_label());
    for item in chat.transcript() {
        let _ = writeln!(out, "{}", render_item(item));
    }
    if let Some(image) = chat.staged_image() {
        let _ = writeln!(out, "(attached: {})", image.file_name());
    }
    if chat.is_thinking() {
        out.push_str("AI is thinking...\n");
    }
    out
}

/// Everything on screen.
#[must_use]
pub fn render(state: &ViewState, limits: &ImageLimits) -> String {
    let mut out = render_status(state.status);
    out.push_str("\n\n");
    out.push_str(&render_upload(&state.upload, limits));
    if let Some(sentiment) = &state.sentiment {
        out.push_str("\n\n");
        out.push_str(&render_sentiment(sentiment));
    }
    if let Some(chat) = &state.chat {
        out.push_str("\n\n");
        out.push_str(&render_chat(chat));
    }
    if state.loading {
        out.push_str("\nLoading...");
    }
    out
}

/// Prints only transcript lines not shown before.
///
/// A transcript that shrinks (new session) is printed again from the top.
#[derive(Debug, Default)]
pub struct TranscriptCursor {
    shown: usize,
    session: Option<String>,
}

impl TranscriptCursor {
    /// New cursor with nothing shown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines added since the last call.
    pub fn advance(&mut self, chat: &ChatState) -> Vec<String> {
        let session = chat.session().map(|s| s.as_str().to_string());
        let transcript = chat.transcript();
        if session != self.session || transcript.len() < self.shown {
            self.shown = 0;
            self.session = session;
        }
        let lines = transcript[self.shown..].iter().map(render_item).collect();
        self.shown = transcript.len();
        lines
    }
}
