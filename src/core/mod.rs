//! Core backup logic for chatvault.
//!
//! This module contains:
//! - [`media`] - Media download, relocation and extension fixes
//! - [`sequencer`] - Strictly ordered processing of one history page
//! - [`driver`] - Per-conversation state machine and pagination
//! - [`queue`] - Conversation selection and the backup queue
//! - [`runner`] - Whole-run orchestration ([`Backup`])
//! - [`output`] - JSONL output
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chatvault::core::{Backup, BackupReport};
//! use chatvault::config::BackupConfig;
//! use chatvault::source::DumpSource;
//!
//! # async fn example() -> chatvault::Result<BackupReport> {
//! let source = DumpSource::open("dump.json".as_ref()).await?;
//! Backup::new(source, BackupConfig::new().with_target("My Chat")).run().await
//! # }
//! ```

pub mod driver;
pub mod media;
pub mod output;
pub mod queue;
pub mod runner;
pub mod sequencer;

pub use driver::{ConversationDriver, ConversationReport, ConversationStats, Cursor, DriverState};
pub use media::{MediaFetcher, MediaOutcome, corrected_file_name};
pub use output::{JsonlSink, to_jsonl_line};
pub use queue::{BackupQueue, QueueStatus, QueueStep, SelectedConversation, TargetFilter};
pub use runner::{Backup, BackupReport};
pub use sequencer::{ChunkSequencer, Continuation};
