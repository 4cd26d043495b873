//! Conversations (peers) as read from the dialog listing.
//!
//! A [`Peer`] is immutable once read. Its display name is used to derive
//! the output file name and the media directory name through
//! [`sanitize_name`].
//!
//! # Example
//!
//! ```
//! use chatvault::peer::{Peer, sanitize_name};
//!
//! let peer = Peer::group(42, "My Chat / 2024");
//! assert_eq!(peer.file_stem(), "My_Chat___2024");
//! assert_eq!(sanitize_name("My_Chat___2024"), "My_Chat___2024");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-.,;]").expect("static pattern is valid"));

/// Replaces every character outside `[A-Za-z0-9\-.,;]` with `_`.
///
/// The replacement is per character, so multi-byte characters become a
/// single underscore. Sanitizing an already sanitized name is a no-op.
///
/// ```
/// use chatvault::peer::sanitize_name;
///
/// assert_eq!(sanitize_name("Иван & Co."), "_______Co.");
/// assert_eq!(sanitize_name("a-b.c,d;e"), "a-b.c,d;e");
/// ```
pub fn sanitize_name(name: &str) -> String {
    match UNSAFE_CHARS.replace_all(name, "_") {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Kind of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerKind {
    /// One-to-one conversation with a user
    User,
    /// Basic group chat
    Group,
    /// End-to-end encrypted chat with a single user
    SecretChat,
    /// Broadcast channel or supergroup
    Channel,
}

impl PeerKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerKind::User => "user",
            PeerKind::Group => "group",
            PeerKind::SecretChat => "secret_chat",
            PeerKind::Channel => "channel",
        }
    }
}

impl fmt::Display for PeerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation or a message participant.
///
/// Kind-specific attributes are optional and only meaningful for the
/// matching [`PeerKind`]: `phone`, `username`, `first_name` and `last_name`
/// for users, `user_id` for secret chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Service-wide identifier.
    pub id: i64,

    /// Kind of peer.
    pub kind: PeerKind,

    /// Display name as shown in the dialog list.
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Counterpart user of a secret chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Peer {
    /// Creates a peer of the given kind with no optional attributes.
    pub fn new(id: i64, kind: PeerKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            phone: None,
            username: None,
            first_name: None,
            last_name: None,
            user_id: None,
        }
    }

    /// Creates a user peer whose display name is its first name.
    pub fn user(id: i64, first_name: impl Into<String>) -> Self {
        let first_name = first_name.into();
        let mut peer = Self::new(id, PeerKind::User, first_name.clone());
        peer.first_name = Some(first_name);
        peer
    }

    /// Creates a group peer.
    pub fn group(id: i64, name: impl Into<String>) -> Self {
        Self::new(id, PeerKind::Group, name)
    }

    /// Creates a channel peer.
    pub fn channel(id: i64, name: impl Into<String>) -> Self {
        Self::new(id, PeerKind::Channel, name)
    }

    /// Creates a secret chat peer with the given counterpart.
    pub fn secret_chat(id: i64, name: impl Into<String>, user_id: i64) -> Self {
        let mut peer = Self::new(id, PeerKind::SecretChat, name);
        peer.user_id = Some(user_id);
        peer
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Returns `true` for a user that carries nothing to identify it by.
    ///
    /// Deleted and anonymous accounts come back from the service as users
    /// with every name field empty. Such peers are not selected for backup
    /// and are written as `null` when they appear inside a message.
    pub fn is_unidentifiable(&self) -> bool {
        fn blank(value: Option<&String>) -> bool {
            value.is_none_or(|v| v.trim().is_empty())
        }

        self.kind == PeerKind::User
            && blank(self.first_name.as_ref())
            && blank(self.last_name.as_ref())
            && blank(self.username.as_ref())
            && blank(self.phone.as_ref())
    }

    /// Sanitized display name used for file and directory names.
    pub fn file_stem(&self) -> String {
        sanitize_name(&self.name)
    }

    /// Reduces the peer to the fields worth keeping inside a record.
    ///
    /// Returns `None` for unidentifiable users.
    pub fn summary(&self) -> Option<PeerSummary> {
        if self.is_unidentifiable() {
            return None;
        }

        let mut summary = PeerSummary {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            phone: None,
            username: None,
            first_name: None,
            last_name: None,
            user_id: None,
        };
        match self.kind {
            PeerKind::User => {
                summary.phone.clone_from(&self.phone);
                summary.username.clone_from(&self.username);
                summary.first_name.clone_from(&self.first_name);
                summary.last_name.clone_from(&self.last_name);
            }
            PeerKind::SecretChat => summary.user_id = self.user_id,
            PeerKind::Group | PeerKind::Channel => {}
        }
        Some(summary)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.kind, self.id)
    }
}

/// Minimal peer representation stored in a [`MessageRecord`](crate::MessageRecord).
///
/// Kind-specific keys are omitted when they don't apply or are unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: PeerKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}
