//! Strictly ordered processing of one history page.
//!
//! A page is turned into a queue of units, one per non-empty slot, before
//! any of them runs. Each unit normalizes its message, resolves its media
//! and appends its line; the next unit starts only after that line has been
//! flushed. Empty slots never become units.
//!
//! The page arrives together with its [`Continuation`], decided by the
//! driver before processing starts, and hands it back once the last unit
//! is done. An empty page hands it back immediately.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::Result;
use crate::events::{BackupEvent, EventCallback};
use crate::record::{MessageRecord, RawMessage};
use crate::source::HistoryPage;

use super::driver::ActiveConversation;
use super::media::{MediaFetcher, MediaOutcome};

/// What follows a fully processed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Request the next page.
    FetchNext { offset: usize, limit: usize },
    /// The conversation is drained.
    Finish,
}

/// One message's pending work.
#[derive(Debug)]
struct Unit {
    raw: RawMessage,
}

/// Builds the unit queue for a page, dropping empty slots.
fn plan(page: HistoryPage) -> VecDeque<Unit> {
    page.into_iter().flatten().map(|raw| Unit { raw }).collect()
}

/// Runs pages through normalization, media download and writing.
pub struct ChunkSequencer<'a> {
    fetcher: MediaFetcher<'a>,
    events: EventCallback,
}

impl<'a> ChunkSequencer<'a> {
    pub fn new(fetcher: MediaFetcher<'a>, events: EventCallback) -> Self {
        Self { fetcher, events }
    }

    /// Processes `page` in order and returns `then` once every line is written.
    ///
    /// Only a write failure is an error; media failures are recorded in the
    /// conversation's statistics and reported as events.
    pub async fn run(
        &self,
        page: HistoryPage,
        then: Continuation,
        conversation: &mut ActiveConversation,
    ) -> Result<Continuation> {
        let mut units = plan(page);
        trace!(units = units.len(), "page planned");

        while let Some(unit) = units.pop_front() {
            self.run_unit(unit, conversation).await?;
        }
        Ok(then)
    }

    async fn run_unit(&self, unit: Unit, conversation: &mut ActiveConversation) -> Result<()> {
        let Unit { raw } = unit;
        let mut record = MessageRecord::from(&raw);
        if !record.has_timestamp() {
            conversation.stats.missing_timestamps += 1;
        }

        match self
            .fetcher
            .fetch(&raw, &mut record, &mut conversation.media_dir)
            .await
        {
            MediaOutcome::Skipped => {}
            MediaOutcome::Saved(_) => conversation.stats.media_saved += 1,
            MediaOutcome::Failed(reason) => {
                conversation.stats.media_failed += 1;
                (self.events)(&BackupEvent::MediaFailed {
                    conversation: conversation.name().to_string(),
                    message_id: raw.id,
                    reason,
                });
            }
        }

        conversation.sink.append(&record).await?;
        conversation.stats.messages_written += 1;
        Ok(())
    }
}
