//! Client-generated chat session identifiers.
//!
//! Ids look like `session_1718000000000_k3j9x0a2b`: a fixed prefix, the
//! creation time in epoch milliseconds, and nine random base36 characters.
//! The server treats them as opaque.

use std::fmt;

use chrono::Utc;
use rand::Rng;

const PREFIX: &str = "session_";
const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Characters of the id kept when it is displayed.
pub const DISPLAY_LEN: usize = 20;

/// An opaque chat session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id from the current time.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().timestamp_millis(), &mut rand::thread_rng())
    }

    /// Generate an id for a given timestamp and random source.
    pub fn generate_at<R: Rng + ?Sized>(epoch_millis: i64, rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
            .collect();
        Self(format!("{PREFIX}{epoch_millis}_{suffix}"))
    }

    /// Wrap an id received from elsewhere (e.g. the server or the CLI).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether the id has the client-generated shape.
    #[must_use]
    pub fn is_well_formed(raw: &str) -> bool {
        let Some(rest) = raw.strip_prefix(PREFIX) else {
            return false;
        };
        let Some((millis, suffix)) = rest.split_once('_') else {
            return false;
        };
        !millis.is_empty()
            && millis.bytes().all(|b| b.is_ascii_digit())
            && suffix.len() == SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
    }

    /// The full id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as shown in the chat header.
    #[must_use]
    pub fn display_label(&self) -> String {
        display_label(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Truncate any session id to its first [`DISPLAY_LEN`] characters plus `...`.
#[must_use]
pub fn display_label(raw: &str) -> String {
    let head: String = raw.chars().take(DISPLAY_LEN).collect();
    format!("{head}...")
}
