//! Lifecycle of one conversation's backup.
//!
//! ```text
//! Idle ──open──▶ FetchingPage ──page──▶ ProcessingPage ──FetchNext──▶ FetchingPage
//!                                              │
//!                                              └──Finish──▶ Completed
//! ```
//!
//! The driver owns the output file and the media directory for as long as
//! the conversation is in progress and releases both before returning.
//!
//! # Pagination
//!
//! Whether another page follows is decided when a page arrives, before any
//! of its messages is processed: another page is due when the page came back
//! full and, with a positive history limit, the running total is still below
//! it. The next request is clamped so the total never exceeds the limit.
//!
//! | chunk | limit | history | requests |
//! |-------|-------|---------|----------|
//! | 100 | 0 | 3 | `(0,100)` |
//! | 100 | 0 | 250 | `(0,100)` `(100,100)` `(200,100)` |
//! | 100 | 120 | 500 | `(0,100)` `(100,20)` |

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::BackupConfig;
use crate::error::{Result, VaultError};
use crate::events::{BackupEvent, EventCallback};
use crate::peer::Peer;
use crate::source::HistorySource;

use super::media::{MediaDir, MediaFetcher};
use super::output::JsonlSink;
use super::queue::SelectedConversation;
use super::sequencer::{ChunkSequencer, Continuation};

/// Where the driver is in a conversation's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    FetchingPage,
    ProcessingPage,
    Completed,
}

/// Pagination cursor of one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    chunk_size: usize,
    limit: Option<usize>,
    fetched: usize,
}

impl Cursor {
    /// `limit` is the positive history limit, if any.
    pub fn new(chunk_size: usize, limit: Option<usize>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            limit,
            fetched: 0,
        }
    }

    /// Messages requested so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Budget left under the history limit, if one is set.
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|l| l.saturating_sub(self.fetched))
    }

    fn clamped_chunk(&self) -> usize {
        self.remaining()
            .map_or(self.chunk_size, |left| left.min(self.chunk_size))
    }

    /// The first request of a conversation.
    pub fn first(&self) -> Continuation {
        Continuation::FetchNext {
            offset: 0,
            limit: self.clamped_chunk(),
        }
    }

    /// Accounts for a page of `returned` slots answering a request for
    /// `requested`, and decides what follows it.
    pub fn advance(&mut self, requested: usize, returned: usize) -> Continuation {
        self.fetched += requested;
        let under_limit = self.limit.is_none_or(|l| self.fetched < l);
        if returned == requested && under_limit {
            Continuation::FetchNext {
                offset: self.fetched,
                limit: self.clamped_chunk(),
            }
        } else {
            Continuation::Finish
        }
    }
}

/// Per-conversation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationStats {
    pub messages_written: usize,
    pub pages_fetched: usize,
    pub media_saved: usize,
    pub media_failed: usize,
    pub missing_timestamps: usize,
}

/// Summary of one completed conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationReport {
    pub conversation: String,
    pub path: PathBuf,
    pub stats: ConversationStats,
}

/// Resources held while a conversation is in progress.
pub struct ActiveConversation {
    name: String,
    pub(crate) sink: JsonlSink,
    pub(crate) media_dir: MediaDir,
    pub(crate) stats: ConversationStats,
    state: DriverState,
}

impl ActiveConversation {
    /// Creates (or truncates) `<backup_dir>/<stem>.jsonl`.
    ///
    /// The media directory is only described here; it is created when the
    /// first file lands in it.
    pub async fn open(peer: &Peer, stem: &str, backup_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(backup_dir).await?;
        let sink = JsonlSink::create(backup_dir.join(format!("{stem}.jsonl"))).await?;
        Ok(Self {
            name: peer.name.clone(),
            sink,
            media_dir: MediaDir::new(backup_dir, stem),
            stats: ConversationStats::default(),
            state: DriverState::Idle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        self.sink.path()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn stats(&self) -> &ConversationStats {
        &self.stats
    }

    fn enter(&mut self, state: DriverState) {
        debug!(conversation = %self.name, from = ?self.state, to = ?state, "state change");
        self.state = state;
    }

    async fn close(mut self) -> Result<ConversationReport> {
        self.enter(DriverState::Completed);
        let path = self.sink.path().to_path_buf();
        let lines = self.sink.close().await?;
        debug_assert_eq!(lines, self.stats.messages_written, "line count of {}", path.display());
        Ok(ConversationReport {
            conversation: self.name,
            path,
            stats: self.stats,
        })
    }
}

/// Drives one conversation from an empty file to a closed, complete one.
pub struct ConversationDriver<'a> {
    source: &'a dyn HistorySource,
    config: &'a BackupConfig,
    events: EventCallback,
}

impl<'a> ConversationDriver<'a> {
    pub fn new(source: &'a dyn HistorySource, config: &'a BackupConfig, events: EventCallback) -> Self {
        Self {
            source,
            config,
            events,
        }
    }

    fn emit(&self, event: BackupEvent) {
        (self.events)(&event);
    }

    /// Backs up the selected conversation completely.
    ///
    /// A failed page request aborts with [`VaultError::FatalTransport`];
    /// lines of earlier pages stay on disk, nothing of the failed page is
    /// written.
    pub async fn run(&self, selected: &SelectedConversation) -> Result<ConversationReport> {
        let peer = &selected.peer;
        let mut conversation =
            ActiveConversation::open(peer, &selected.stem, &self.config.backup_dir).await?;
        info!(conversation = %peer.name, path = %conversation.path().display(), "backing up");
        self.emit(BackupEvent::ConversationStarted {
            conversation: peer.name.clone(),
            path: conversation.path().to_path_buf(),
        });

        let fetcher = MediaFetcher::new(self.source, self.config.media, self.config.media_delay());
        let sequencer = ChunkSequencer::new(fetcher, self.events.clone());
        let mut cursor = Cursor::new(self.config.chunk_size, self.config.limit());
        let mut next = cursor.first();

        while let Continuation::FetchNext { offset, limit } = next {
            conversation.enter(DriverState::FetchingPage);
            self.emit(BackupEvent::PageRequested {
                conversation: peer.name.clone(),
                first: offset,
                last: (offset + limit).saturating_sub(1),
            });

            let page = self
                .source
                .fetch_history_page(peer, offset, limit)
                .await
                .map_err(|e| VaultError::fatal_transport(&peer.name, offset, limit, e))?;
            conversation.stats.pages_fetched += 1;
            debug!(conversation = %peer.name, offset, limit, returned = page.len(), "page received");

            let then = cursor.advance(limit, page.len());
            conversation.enter(DriverState::ProcessingPage);
            next = sequencer.run(page, then, &mut conversation).await?;

            let delay = self.config.request_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let missing = std::mem::take(&mut conversation.stats.missing_timestamps);
        if missing > 0 {
            warn!(conversation = %peer.name, count = missing, "messages without timestamp");
            self.emit(BackupEvent::MissingTimestamps {
                conversation: peer.name.clone(),
                count: missing,
            });
        }

        let mut report = conversation.close().await?;
        report.stats.missing_timestamps = missing;
        info!(
            conversation = %peer.name,
            messages = report.stats.messages_written,
            pages = report.stats.pages_fetched,
            "conversation complete"
        );
        self.emit(BackupEvent::ConversationCompleted {
            conversation: peer.name.clone(),
            messages: report.stats.messages_written,
        });
        Ok(report)
    }
}
