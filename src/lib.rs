//! # Chatvault
//!
//! A Rust library for archiving the full message history of selected
//! conversations into append-only JSONL files, with optional media download.
//!
//! ## Overview
//!
//! Chatvault pages through each selected conversation from the newest
//! message backwards, turns every message into a flat [`MessageRecord`],
//! downloads its media when enabled and appends one JSON line per message
//! to `<backup_dir>/<Name>.jsonl`. Media lands in `<backup_dir>/<Name>_files/`.
//!
//! Messages are processed strictly one after another: a message's media
//! download starts only after the previous message's line is on disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatvault::prelude::*;
//! use chatvault::source::DumpSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let source = DumpSource::open("dump.json".as_ref()).await?;
//!     let config = BackupConfig::new()
//!         .with_target("My Chat")
//!         .with_history_limit(1_000)
//!         .with_media(MediaConfig::new().with_photos(true));
//!
//!     let report = Backup::new(source, config)
//!         .with_events(stderr_events())
//!         .run()
//!         .await?;
//!     println!("{} messages archived", report.messages_written());
//!     Ok(())
//! }
//! ```
//!
//! ## Bring your own transport
//!
//! The backup only talks to the outside world through [`HistorySource`].
//! Implement it for a live client; [`source::MemorySource`] and
//! [`source::DumpSource`] ship with the crate.
//!
//! ## Module Structure
//!
//! - [`config`] — [`BackupConfig`], [`MediaConfig`]
//! - [`core`] — Backup engine
//!   - [`core::runner`] — [`Backup`], [`BackupReport`]
//!   - [`core::queue`] — [`TargetFilter`](core::TargetFilter), [`BackupQueue`](core::BackupQueue)
//!   - [`core::driver`] — per-conversation pagination
//!   - [`core::sequencer`] — ordered page processing
//!   - [`core::media`] — media download and relocation
//!   - [`core::output`] — JSONL writer
//! - [`record`] — [`RawMessage`], [`MessageRecord`], [`normalize`]
//! - [`peer`] — [`Peer`], [`sanitize_name`]
//! - [`source`] — [`HistorySource`] and bundled sources
//! - [`events`] — [`BackupEvent`] notifications
//! - [`error`] — Unified error types ([`VaultError`], [`Result`])
//! - [`prelude`] — Convenient re-exports

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
#[cfg(feature = "cli")]
pub mod logging;
pub mod peer;
pub mod record;
pub mod source;

// Re-export the main types at the crate root for convenience
pub use config::{BackupConfig, MediaConfig};
pub use crate::core::{Backup, BackupReport};
pub use error::{Result, SourceError, VaultError};
pub use events::{BackupEvent, EventCallback};
pub use peer::{Peer, PeerKind, sanitize_name};
pub use record::{MessageRecord, RawMessage, normalize};
pub use source::HistorySource;

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use chatvault::prelude::*;
/// ```
pub mod prelude {
    // Records
    pub use crate::record::{MediaKind, MessageAction, MessageRecord, RawMedia, RawMessage, normalize};

    // Peers
    pub use crate::peer::{Peer, PeerKind, sanitize_name};

    // Error types
    pub use crate::error::{Result, SourceError, VaultError};

    // Configuration
    pub use crate::config::{BackupConfig, MediaConfig};

    // Running a backup
    pub use crate::core::{Backup, BackupReport, ConversationReport, TargetFilter};

    // Notifications
    pub use crate::events::{BackupEvent, EventCallback, no_events, stderr_events};

    // Sources
    pub use crate::source::HistorySource;
}
