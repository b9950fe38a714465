//! Chat capability: session, transcript, and the staged chat image.
//!
//! A controller carries a [`ChatState`] only when chat is enabled. All
//! transcript mutations go through here so the welcome state and the
//! thinking indicator stay consistent.

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::session::{SessionId, display_label};
use crate::upload::StagedImage;

/// Greeting shown at the top of every fresh transcript.
pub const WELCOME_TEXT: &str =
    "Hello! I'm SmolVLM, your AI assistant. You can ask me questions about text or images!";

/// Assistant bubble appended when a chat request fails.
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// User bubble text for an image sent without a message.
pub const IMAGE_ONLY_TEXT: &str = "(Image)";

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person at the keyboard.
    User,
    /// The remote model.
    Assistant,
}

/// A rendered chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    /// Sender.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Preview of an attached image (user messages only).
    pub image: Option<Arc<str>>,
    /// When the entry was added.
    pub timestamp: DateTime<Local>,
}

/// One line of the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptItem {
    /// Greeting naming the session it was created for.
    Welcome {
        /// Full session id.
        session_id: String,
    },
    /// A user or assistant message.
    Message(ChatEntry),
}

/// Chat-side state owned by the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    session: Option<SessionId>,
    session_label: String,
    transcript: Vec<TranscriptItem>,
    thinking: bool,
    staged_image: Option<StagedImage>,
}

impl ChatState {
    /// Empty chat with no session yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session, if one was started.
    #[must_use]
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Session id as shown in the header.
    #[must_use]
    pub fn session_label(&self) -> &str {
        &self.session_label
    }

    /// The transcript, oldest first.
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptItem] {
        &self.transcript
    }

    /// Only the messages, skipping the welcome line.
    pub fn messages(&self) -> impl Iterator<Item = &ChatEntry> {
        self.transcript.iter().filter_map(|item| match item {
            TranscriptItem::Message(entry) => Some(entry),
            TranscriptItem::Welcome { .. } => None,
        })
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    /// The staged chat image.
    #[must_use]
    pub fn staged_image(&self) -> Option<&StagedImage> {
        self.staged_image.as_ref()
    }

    /// Start a fresh session and reset the transcript to the welcome state.
    pub fn start_session(&mut self, id: SessionId) -> &SessionId {
        self.session_label = id.display_label();
        self.transcript = vec![TranscriptItem::Welcome {
            session_id: id.as_str().to_string(),
        }];
        self.thinking = false;
        self.session.insert(id)
    }

    /// Continue an existing session without touching the transcript.
    pub fn resume_session(&mut self, id: SessionId) {
        self.session_label = id.display_label();
        self.session = Some(id);
    }

    /// The current session, starting a new one if there is none.
    pub fn ensure_session(&mut self) -> SessionId {
        if let Some(id) = &self.session {
            return id.clone();
        }
        self.start_session(SessionId::generate()).clone()
    }

    /// Show a server-provided session id in the header.
    pub fn show_session_label(&mut self, raw: &str) {
        self.session_label = display_label(raw);
    }

    /// Append a user message, with the preview of `image` if given.
    pub fn push_user(&mut self, content: impl Into<String>, image: Option<&StagedImage>) {
        self.push(Role::User, content.into(), image.map(StagedImage::preview_url));
    }

    /// Append an assistant message.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into(), None);
    }

    fn push(&mut self, role: Role, content: String, image: Option<Arc<str>>) {
        self.transcript.push(TranscriptItem::Message(ChatEntry {
            role,
            content,
            image,
            timestamp: Local::now(),
        }));
    }

    /// Show or hide the thinking indicator.
    pub fn set_thinking(&mut self, thinking: bool) {
        self.thinking = thinking;
    }

    /// Stage an image for the next turn, replacing any previous one.
    pub fn stage_image(&mut self, image: StagedImage) {
        self.staged_image = Some(image);
    }

    /// Drop the staged image.
    pub fn remove_image(&mut self) -> Option<StagedImage> {
        self.staged_image.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_session_resets_to_welcome() {
        let mut chat = ChatState::new();
        let first = chat.start_session(SessionId::from_raw("session_1_aaaaaaaaa")).clone();
        chat.push_user("hi", None);
        chat.push_assistant("hello");
        chat.set_thinking(true);
        assert_eq!(chat.messages().count(), 2);

        chat.start_session(SessionId::from_raw("session_2_bbbbbbbbb"));
        assert_ne!(chat.session(), Some(&first));
        assert_eq!(
            chat.transcript(),
            &[TranscriptItem::Welcome {
                session_id: "session_2_bbbbbbbbb".into()
            }]
        );
        assert!(!chat.is_thinking());
    }

    #[test]
    fn ensure_session_is_lazy() {
        let mut chat = ChatState::new();
        assert!(chat.session().is_none());

        let id = chat.ensure_session();
        assert!(SessionId::is_well_formed(id.as_str()));
        assert_eq!(chat.transcript().len(), 1);

        chat.push_user("x", None);
        assert_eq!(chat.ensure_session(), id);
        assert_eq!(chat.transcript().len(), 2);
    }

    #[test]
    fn user_entries_carry_image_preview() {
        let mut chat = ChatState::new();
        let image = StagedImage::new("a.png", "image/png", vec![1, 2, 3]);
        chat.push_user(IMAGE_ONLY_TEXT, Some(&image));

        let entry = chat.messages().next().unwrap();
        assert_eq!(entry.role, Role::User);
        assert_eq!(entry.content, "(Image)");
        assert_eq!(entry.image.as_deref(), Some("data:image/png;base64,AQID"));
    }

    #[test]
    fn staging_replaces_previous_image() {
        let mut chat = ChatState::new();
        chat.stage_image(StagedImage::new("a.png", "image/png", vec![1]));
        chat.stage_image(StagedImage::new("b.png", "image/png", vec![2]));
        assert_eq!(chat.staged_image().unwrap().file_name(), "b.png");
        assert!(chat.remove_image().is_some());
        assert!(chat.staged_image().is_none());
    }
}
