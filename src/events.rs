//! Notification channel for backup runs.
//!
//! Every noteworthy step of a run is reported as a [`BackupEvent`] through an
//! [`EventCallback`]. Events are also logged through `tracing`, so library
//! users can pick whichever channel suits them.
//!
//! # Example
//!
//! ```rust
//! use chatvault::events::{BackupEvent, EventCallback};
//! use std::sync::Arc;
//!
//! let callback: EventCallback = Arc::new(|event| {
//!     if event.is_warning() {
//!         eprintln!("warning: {event}");
//!     }
//! });
//!
//! callback(&BackupEvent::MissingTimestamps {
//!     conversation: "MyChat".into(),
//!     count: 3,
//! });
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Something that happened during a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackupEvent {
    /// The dialog list is being requested.
    ListingConversations,

    /// The queue was filled.
    Selected { count: usize },

    /// The target filter matched nothing.
    NothingSelected,

    /// A conversation became current.
    ConversationStarted { conversation: String, path: PathBuf },

    /// A history page is about to be requested.
    ///
    /// `first` and `last` are zero-based message positions.
    PageRequested {
        conversation: String,
        first: usize,
        last: usize,
    },

    /// A media download failed; the record is written with `file: null`.
    MediaFailed {
        conversation: String,
        message_id: i64,
        reason: String,
    },

    /// Some messages of a finished conversation had no timestamp.
    MissingTimestamps { conversation: String, count: usize },

    /// A conversation was fully drained and its file closed.
    ConversationCompleted {
        conversation: String,
        messages: usize,
    },

    /// The queue is empty.
    AllCompleted { conversations: usize },
}

impl BackupEvent {
    /// Returns `true` for events that indicate degraded output.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            BackupEvent::MediaFailed { .. } | BackupEvent::MissingTimestamps { .. }
        )
    }
}

impl fmt::Display for BackupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupEvent::ListingConversations => write!(f, "Fetching dialog list"),
            BackupEvent::Selected { count } => {
                write!(f, "Proceeding to backup {count} dialog(s)")
            }
            BackupEvent::NothingSelected => write!(f, "No dialogs selected for backup"),
            BackupEvent::ConversationStarted { conversation, path } => {
                write!(f, "Backing up {conversation} to {}", path.display())
            }
            BackupEvent::PageRequested {
                conversation,
                first,
                last,
            } => write!(f, "Backing up {conversation} [messages {first}-{last}]"),
            BackupEvent::MediaFailed {
                conversation,
                message_id,
                reason,
            } => write!(
                f,
                "Media of message {message_id} in {conversation} could not be downloaded: {reason}"
            ),
            BackupEvent::MissingTimestamps {
                conversation,
                count,
            } => write!(f, "{count} message(s) in {conversation} had no timestamp"),
            BackupEvent::ConversationCompleted {
                conversation,
                messages,
            } => write!(f, "Finished {conversation} ({messages} messages)"),
            BackupEvent::AllCompleted { .. } => write!(f, "All backups have been completed"),
        }
    }
}

/// Callback type for receiving backup events.
pub type EventCallback = Arc<dyn Fn(&BackupEvent) + Send + Sync>;

/// Creates a callback that ignores every event.
pub fn no_events() -> EventCallback {
    Arc::new(|_| {})
}

/// Creates a callback that prints every event to stderr.
pub fn stderr_events() -> EventCallback {
    Arc::new(|event| {
        if event.is_warning() {
            eprintln!("⚠️  {event}");
        } else {
            eprintln!("{event}");
        }
    })
}
