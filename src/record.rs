//! Raw messages and their normalized, exportable form.
//!
//! [`RawMessage`] is what a [`HistorySource`](crate::source::HistorySource)
//! hands back for one history slot. [`MessageRecord`] is what ends up as one
//! line of a conversation's `.jsonl` file. [`normalize`] converts one into
//! the other and is a pure function: no network, no disk, no clock.
//!
//! # Normalization rules
//!
//! | Raw field | Record field |
//! |-----------|--------------|
//! | `src`, `dest`, `fwd_src` | [`PeerSummary`], or `null` for unidentifiable users |
//! | `date`, `fwd_date` | ISO-8601 string, omitted when the source had none |
//! | `action` (numeric) | symbolic name such as `"ACTION_CHAT_CREATE"`, or `null` |
//! | `reply` (embedded message) | dropped |
//! | `media` | [`MediaRecord`] without the source's download handle |
//!
//! # Example
//!
//! ```
//! use chatvault::record::{RawMessage, normalize};
//! use chatvault::peer::Peer;
//! use chrono::{TimeZone, Utc};
//!
//! let raw = RawMessage::new(10)
//!     .with_text("hello")
//!     .with_date(Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap())
//!     .with_src(Peer::user(1, "Alice"));
//!
//! let record = normalize(Some(&raw)).unwrap();
//! assert_eq!(record.date.as_deref(), Some("2024-06-15T12:30:00Z"));
//! assert!(normalize(None).is_none());
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::peer::{Peer, PeerSummary};

// ============================================================================
// Action codes
// ============================================================================

macro_rules! message_actions {
    ($($code:literal => $variant:ident = $name:literal,)+) => {
        /// Service action carried by a message.
        ///
        /// Declared as a fixed table of numeric codes and symbolic names;
        /// the symbolic name is what gets exported.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum MessageAction {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl MessageAction {
            /// Every action, indexed by code.
            pub const ALL: &'static [MessageAction] = &[$(MessageAction::$variant,)+];

            /// Resolves a numeric action code by exact match.
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some(MessageAction::$variant),)+
                    _ => None,
                }
            }

            /// Numeric code of this action.
            pub fn code(&self) -> i32 {
                match self {
                    $(MessageAction::$variant => $code,)+
                }
            }

            /// Symbolic name, e.g. `"ACTION_CHAT_CREATE"`.
            pub fn name(&self) -> &'static str {
                match self {
                    $(MessageAction::$variant => $name,)+
                }
            }
        }
    };
}

message_actions! {
    0 => NoAction = "ACTION_NONE",
    1 => GeoChatCreate = "ACTION_GEO_CHAT_CREATE",
    2 => GeoChatCheckin = "ACTION_GEO_CHAT_CHECKIN",
    3 => ChatCreate = "ACTION_CHAT_CREATE",
    4 => ChatEditTitle = "ACTION_CHAT_EDIT_TITLE",
    5 => ChatEditPhoto = "ACTION_CHAT_EDIT_PHOTO",
    6 => ChatDeletePhoto = "ACTION_CHAT_DELETE_PHOTO",
    7 => ChatAddUser = "ACTION_CHAT_ADD_USER",
    8 => ChatAddUserByLink = "ACTION_CHAT_ADD_USER_BY_LINK",
    9 => ChatDeleteUser = "ACTION_CHAT_DELETE_USER",
    10 => SetMessageTtl = "ACTION_SET_MESSAGE_TTL",
    11 => ReadMessages = "ACTION_READ_MESSAGES",
    12 => DeleteMessages = "ACTION_DELETE_MESSAGES",
    13 => ScreenshotMessages = "ACTION_SCREENSHOT_MESSAGES",
    14 => FlushHistory = "ACTION_FLUSH_HISTORY",
    15 => Resend = "ACTION_RESEND",
    16 => NotifyLayer = "ACTION_NOTIFY_LAYER",
    17 => Typing = "ACTION_TYPING",
    18 => Noop = "ACTION_NOOP",
    19 => CommitKey = "ACTION_COMMIT_KEY",
    20 => AbortKey = "ACTION_ABORT_KEY",
    21 => RequestKey = "ACTION_REQUEST_KEY",
    22 => AcceptKey = "ACTION_ACCEPT_KEY",
    23 => ChannelCreate = "ACTION_CHANNEL_CREATE",
    24 => MigratedTo = "ACTION_MIGRATED_TO",
    25 => MigratedFrom = "ACTION_MIGRATED_FROM",
}

impl std::fmt::Display for MessageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Media
// ============================================================================

/// Kind of media attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Document,
    Video,
    Audio,
    /// Media without a downloadable payload (geo, contact, web page, ...)
    #[default]
    None,
}

impl MediaKind {
    /// Returns `true` for kinds that have a file behind them.
    pub fn is_downloadable(&self) -> bool {
        !matches!(self, MediaKind::None)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaKind::Photo => "photo",
            MediaKind::Document => "document",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::None => "none",
        };
        f.write_str(name)
    }
}

/// Media descriptor as delivered by the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawMedia {
    #[serde(rename = "type", default)]
    pub kind: MediaKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Opaque handle the source uses to resolve the download.
    ///
    /// Never exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl RawMedia {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Exported media descriptor.
///
/// The `file` field has three states:
///
/// | Value | Meaning |
/// |-------|---------|
/// | absent | no download attempted for this kind |
/// | `null` | download attempted and failed |
/// | `"<dir>/<name>"` | downloaded, path relative to the backup directory |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    #[serde(rename = "type")]
    pub kind: MediaKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub file: Option<Option<String>>,
}

impl MediaRecord {
    fn from_raw(raw: &RawMedia) -> Self {
        Self {
            kind: raw.kind,
            caption: raw.caption.clone(),
            mime_type: raw.mime_type.clone(),
            file_name: raw.file_name.clone(),
            size: raw.size,
            file: None,
        }
    }

    /// Records a successful download.
    pub fn mark_saved(&mut self, relative_path: impl Into<String>) {
        self.file = Some(Some(relative_path.into()));
    }

    /// Records a failed download.
    pub fn mark_failed(&mut self) {
        self.file = Some(None);
    }

    /// Returns `true` once a download has been attempted.
    pub fn fetch_attempted(&self) -> bool {
        self.file.is_some()
    }

    /// Relative path of the saved file, if the download succeeded.
    pub fn saved_path(&self) -> Option<&str> {
        self.file.as_ref().and_then(|f| f.as_deref())
    }
}

/// Keeps an explicit `null` distinct from a missing key.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Messages
// ============================================================================

/// One history slot as returned by the source.
///
/// The field list is fixed; everything the service sends beyond it is
/// ignored when deserializing a dump.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,

    #[serde(default, with = "chrono::serde::ts_seconds_option", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Peer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<Peer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fwd_src: Option<Peer>,

    #[serde(default, with = "chrono::serde::ts_seconds_option", skip_serializing_if = "Option::is_none")]
    pub fwd_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub out: bool,

    #[serde(default)]
    pub unread: bool,

    #[serde(default)]
    pub service: bool,

    #[serde(default)]
    pub mention: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<RawMedia>,

    /// Numeric action code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<i64>,

    /// The replied-to message, embedded by some sources. Never exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Box<RawMessage>>,
}

impl RawMessage {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn with_src(mut self, peer: Peer) -> Self {
        self.src = Some(peer);
        self
    }

    #[must_use]
    pub fn with_dest(mut self, peer: Peer) -> Self {
        self.dest = Some(peer);
        self
    }

    #[must_use]
    pub fn with_forward(mut self, peer: Peer, date: Option<DateTime<Utc>>) -> Self {
        self.fwd_src = Some(peer);
        self.fwd_date = date;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: RawMedia) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn with_action(mut self, code: i32) -> Self {
        self.action = Some(code);
        self
    }

    #[must_use]
    pub fn with_reply(mut self, reply: RawMessage) -> Self {
        self.reply_id = Some(reply.id);
        self.reply = Some(Box::new(reply));
        self
    }
}

/// Normalized, exportable form of one message.
///
/// Created once per raw message and written once; a record is never
/// touched again after its line has been flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,

    /// ISO-8601 timestamp; omitted when the source had none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    pub src: Option<PeerSummary>,
    pub dest: Option<PeerSummary>,
    pub fwd_src: Option<PeerSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fwd_date: Option<String>,

    pub out: bool,
    pub unread: bool,
    pub service: bool,
    pub mention: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<i64>,

    pub action: Option<MessageAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRecord>,
}

impl MessageRecord {
    /// Returns `true` when the source supplied a send date.
    pub fn has_timestamp(&self) -> bool {
        self.date.is_some()
    }
}

impl From<&RawMessage> for MessageRecord {
    fn from(raw: &RawMessage) -> Self {
        Self {
            id: raw.id,
            date: raw.date.as_ref().map(iso8601),
            src: raw.src.as_ref().and_then(Peer::summary),
            dest: raw.dest.as_ref().and_then(Peer::summary),
            fwd_src: raw.fwd_src.as_ref().and_then(Peer::summary),
            fwd_date: raw.fwd_date.as_ref().map(iso8601),
            out: raw.out,
            unread: raw.unread,
            service: raw.service,
            mention: raw.mention,
            text: raw.text.clone(),
            reply_id: raw.reply_id,
            action: raw.action.and_then(MessageAction::from_code),
            media: raw.media.as_ref().map(MediaRecord::from_raw),
        }
    }
}

/// Normalizes one history slot.
///
/// Returns `None` for an empty slot, which callers skip entirely.
pub fn normalize(raw: Option<&RawMessage>) -> Option<MessageRecord> {
    raw.map(MessageRecord::from)
}

fn iso8601(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PeerKind;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, 30, 0).unwrap()
    }

    #[test]
    fn test_action_table_is_dense() {
        for (code, action) in MessageAction::ALL.iter().enumerate() {
            assert_eq!(action.code(), code as i32);
            assert_eq!(MessageAction::from_code(code as i32), Some(*action));
        }
        assert_eq!(MessageAction::ALL.len(), 26);
    }

    #[test]
    fn test_action_names() {
        assert_eq!(MessageAction::from_code(0).unwrap().name(), "ACTION_NONE");
        assert_eq!(
            MessageAction::from_code(3).unwrap().name(),
            "ACTION_CHAT_CREATE"
        );
        assert_eq!(
            MessageAction::MigratedFrom.to_string(),
            "ACTION_MIGRATED_FROM"
        );
    }

    #[test]
    fn test_unknown_action_is_none() {
        assert_eq!(MessageAction::from_code(-1), None);
        assert_eq!(MessageAction::from_code(26), None);

        let record = MessageRecord::from(&RawMessage::new(1).with_action(999));
        assert_eq!(record.action, None);
    }

    #[test]
    fn test_action_serializes_as_symbolic_name() {
        let record = MessageRecord::from(&RawMessage::new(1).with_action(7));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action"], "ACTION_CHAT_ADD_USER");

        let none = serde_json::to_value(MessageRecord::from(&RawMessage::new(2))).unwrap();
        assert!(none["action"].is_null());
    }

    #[test]
    fn test_dates_become_iso8601() {
        let raw = RawMessage::new(1)
            .with_date(ts(10))
            .with_forward(Peer::user(2, "Bob"), Some(ts(9)));
        let record = MessageRecord::from(&raw);
        assert_eq!(record.date.as_deref(), Some("2024-01-15T10:30:00Z"));
        assert_eq!(record.fwd_date.as_deref(), Some("2024-01-15T09:30:00Z"));
        assert!(record.has_timestamp());
    }

    #[test]
    fn test_missing_date_is_omitted() {
        let record = MessageRecord::from(&RawMessage::new(1).with_text("x"));
        assert!(!record.has_timestamp());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("date").is_none());
        assert!(json.get("fwd_date").is_none());
    }

    #[test]
    fn test_reply_is_dropped_but_reply_id_kept() {
        let raw = RawMessage::new(2).with_reply(RawMessage::new(1).with_text("parent"));
        let json = serde_json::to_value(MessageRecord::from(&raw)).unwrap();
        assert!(json.get("reply").is_none());
        assert_eq!(json["reply_id"], 1);
    }

    #[test]
    fn test_unidentifiable_sender_becomes_null() {
        let ghost = Peer::new(99, PeerKind::User, "");
        let raw = RawMessage::new(1)
            .with_src(ghost)
            .with_dest(Peer::group(5, "Team"));
        let json = serde_json::to_value(MessageRecord::from(&raw)).unwrap();
        assert!(json["src"].is_null());
        assert_eq!(json["dest"]["name"], "Team");
        assert!(json["fwd_src"].is_null());
    }

    #[test]
    fn test_media_location_is_not_exported() {
        let raw = RawMessage::new(1).with_media(
            RawMedia::new(MediaKind::Photo)
                .with_location("secret-handle")
                .with_caption("sunset"),
        );
        let json = serde_json::to_value(MessageRecord::from(&raw)).unwrap();
        assert_eq!(json["media"]["type"], "photo");
        assert_eq!(json["media"]["caption"], "sunset");
        assert!(json["media"].get("location").is_none());
        assert!(json["media"].get("file").is_none());
    }

    #[test]
    fn test_media_file_states() {
        let mut media = MediaRecord::from_raw(&RawMedia::new(MediaKind::Audio));
        assert!(!media.fetch_attempted());

        media.mark_failed();
        assert!(media.fetch_attempted());
        let json = serde_json::to_value(&media).unwrap();
        assert!(json["file"].is_null());
        assert!(json.as_object().unwrap().contains_key("file"));

        media.mark_saved("Chat_files/1.ogg");
        assert_eq!(media.saved_path(), Some("Chat_files/1.ogg"));
    }

    #[test]
    fn test_media_record_roundtrip_keeps_null_file() {
        let mut media = MediaRecord::from_raw(&RawMedia::new(MediaKind::Photo));
        media.mark_failed();
        let json = serde_json::to_string(&media).unwrap();
        let parsed: MediaRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.file, Some(None));

        let skipped: MediaRecord = serde_json::from_str(r#"{"type":"photo"}"#).unwrap();
        assert_eq!(skipped.file, None);
    }

    #[test]
    fn test_normalize_none_is_skip() {
        assert!(normalize(None).is_none());
    }

    #[test]
    fn test_raw_message_from_dump_json() {
        let raw: RawMessage = serde_json::from_str(
            r#"{"id": 5, "date": 1705314600, "text": "hi", "action": 0,
                "src": {"id": 1, "kind": "user", "name": "Alice", "first_name": "Alice"},
                "extra_field": true}"#,
        )
        .unwrap();
        assert_eq!(raw.id, 5);
        assert_eq!(raw.date.unwrap().timestamp(), 1705314600);
        assert_eq!(raw.src.unwrap().first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_scalar_flags_are_copied() {
        let mut raw = RawMessage::new(1);
        raw.out = true;
        raw.mention = true;
        let record = MessageRecord::from(&raw);
        assert!(record.out);
        assert!(record.mention);
        assert!(!record.unread);
        assert!(!record.service);
    }
}
