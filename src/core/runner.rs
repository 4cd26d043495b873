//! Whole-run orchestration.
//!
//! [`Backup`] lists the dialogs once, builds the [`BackupQueue`] and drives
//! one conversation at a time until the queue is empty. A fatal error stops
//! the run; conversations finished before it keep their files.

use tracing::{error, info};

use crate::config::BackupConfig;
use crate::error::{Result, VaultError};
use crate::events::{BackupEvent, EventCallback, no_events};
use crate::source::HistorySource;

use super::driver::{ConversationDriver, ConversationReport};
use super::queue::{BackupQueue, QueueStep, SelectedConversation, TargetFilter};

/// Outcome of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// One entry per completed conversation, in backup order.
    pub conversations: Vec<ConversationReport>,
}

impl BackupReport {
    /// Returns `true` if the target filter selected nothing.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn messages_written(&self) -> usize {
        self.conversations.iter().map(|c| c.stats.messages_written).sum()
    }

    pub fn media_saved(&self) -> usize {
        self.conversations.iter().map(|c| c.stats.media_saved).sum()
    }

    pub fn media_failed(&self) -> usize {
        self.conversations.iter().map(|c| c.stats.media_failed).sum()
    }

    pub fn missing_timestamps(&self) -> usize {
        self.conversations
            .iter()
            .map(|c| c.stats.missing_timestamps)
            .sum()
    }
}

/// A configured backup run over a [`HistorySource`].
///
/// # Example
///
/// ```rust
/// use chatvault::prelude::*;
/// use chatvault::source::MemorySource;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<()> {
/// let dir = tempfile::tempdir()?;
/// let source = MemorySource::new();
/// source.add_conversation(Peer::group(1, "Team"), vec![Some(RawMessage::new(1))]);
///
/// let config = BackupConfig::new()
///     .with_backup_dir(dir.path())
///     .without_delays();
/// let report = Backup::new(source, config).run().await?;
///
/// assert_eq!(report.messages_written(), 1);
/// assert!(dir.path().join("Team.jsonl").exists());
/// # Ok(())
/// # }
/// ```
pub struct Backup<S> {
    source: S,
    config: BackupConfig,
    events: EventCallback,
}

impl<S: HistorySource> Backup<S> {
    pub fn new(source: S, config: BackupConfig) -> Self {
        Self {
            source,
            config,
            events: no_events(),
        }
    }

    /// Sets the callback receiving [`BackupEvent`]s.
    #[must_use]
    pub fn with_events(mut self, events: EventCallback) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn emit(&self, event: BackupEvent) {
        (self.events)(&event);
    }

    /// Lists the dialogs and returns the queue the run would process.
    pub async fn select(&self) -> Result<BackupQueue> {
        self.emit(BackupEvent::ListingConversations);
        let conversations = self.source.list_conversations().await.map_err(|e| {
            error!(error = %e, "dialog listing failed");
            VaultError::DialogList(e)
        })?;
        info!(dialogs = conversations.len(), "dialog list received");

        let filter = TargetFilter::new(&self.config.targets);
        Ok(BackupQueue::select(conversations, &filter))
    }

    /// Runs the backup to completion.
    pub async fn run(&self) -> Result<BackupReport> {
        self.config.validate()?;
        let mut queue = self.select().await?;
        let mut report = BackupReport::default();

        let mut step = queue.start();
        if step == QueueStep::NothingSelected {
            info!("no dialogs selected");
            self.emit(BackupEvent::NothingSelected);
            return Ok(report);
        }
        info!(count = queue.len(), "dialogs selected");
        self.emit(BackupEvent::Selected { count: queue.len() });

        let driver = ConversationDriver::new(&self.source, &self.config, self.events.clone());
        while let QueueStep::Next(selected) = step {
            report.conversations.push(self.backup_one(&driver, &selected).await?);
            step = queue.advance();
        }

        info!(
            conversations = report.conversations.len(),
            messages = report.messages_written(),
            "all backups completed"
        );
        self.emit(BackupEvent::AllCompleted {
            conversations: report.conversations.len(),
        });
        Ok(report)
    }

    async fn backup_one(
        &self,
        driver: &ConversationDriver<'_>,
        selected: &SelectedConversation,
    ) -> Result<ConversationReport> {
        driver.run(selected).await.inspect_err(|e| {
            error!(conversation = %selected.peer.name, error = %e, "backup aborted");
        })
    }
}
