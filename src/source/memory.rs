//! Scripted in-memory source.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::peer::Peer;
use crate::record::{MediaKind, RawMessage};

use super::traits::{HistoryPage, HistorySource, SourceResult};

/// A page request as seen by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub peer_id: i64,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Default)]
struct State {
    conversations: Vec<(Peer, HistoryPage)>,
    page_requests: Vec<PageRequest>,
    media_requests: Vec<i64>,
    failing_pages: HashSet<(i64, usize)>,
    failing_media: HashSet<i64>,
    media_latency: HashMap<i64, Duration>,
    listing_fails: bool,
}

/// In-memory [`HistorySource`] with request recording.
///
/// History is served in the order it was added, sliced by offset and limit.
/// Media downloads write a small file into the staging directory given to
/// [`with_staging_dir`](Self::with_staging_dir); without one, every download
/// fails.
///
/// # Example
///
/// ```rust
/// use chatvault::source::{MemorySource, PageRequest};
/// use chatvault::peer::Peer;
/// use chatvault::record::RawMessage;
///
/// let source = MemorySource::new();
/// source.add_conversation(Peer::group(1, "Team"), vec![Some(RawMessage::new(1)), None]);
/// source.fail_page(1, 100);
/// assert!(source.page_requests().is_empty());
/// ```
#[derive(Default)]
pub struct MemorySource {
    state: Mutex<State>,
    staging_dir: Option<PathBuf>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory media downloads are written to.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a conversation with its history, in paging order.
    pub fn add_conversation(&self, peer: Peer, history: HistoryPage) {
        self.state().conversations.push((peer, history));
    }

    /// Makes the page request at `offset` for conversation `peer_id` fail.
    pub fn fail_page(&self, peer_id: i64, offset: usize) {
        self.state().failing_pages.insert((peer_id, offset));
    }

    /// Makes the media download of message `message_id` fail.
    pub fn fail_media(&self, message_id: i64) {
        self.state().failing_media.insert(message_id);
    }

    /// Delays the media download of message `message_id`.
    pub fn delay_media(&self, message_id: i64, latency: Duration) {
        self.state().media_latency.insert(message_id, latency);
    }

    /// Makes the dialog listing fail.
    pub fn fail_listing(&self) {
        self.state().listing_fails = true;
    }

    /// Every page request received so far.
    pub fn page_requests(&self) -> Vec<PageRequest> {
        self.state().page_requests.clone()
    }

    /// Message ids of every media request received so far.
    pub fn media_requests(&self) -> Vec<i64> {
        self.state().media_requests.clone()
    }
}

fn default_extension(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "jpg",
        MediaKind::Video => "mp4",
        MediaKind::Audio => "oga",
        MediaKind::Document | MediaKind::None => "bin",
    }
}

#[async_trait]
impl HistorySource for MemorySource {
    async fn list_conversations(&self) -> SourceResult<Vec<Peer>> {
        let state = self.state();
        if state.listing_fails {
            return Err(SourceError::unavailable("dialog listing refused"));
        }
        Ok(state.conversations.iter().map(|(peer, _)| peer.clone()).collect())
    }

    async fn fetch_history_page(
        &self,
        peer: &Peer,
        offset: usize,
        limit: usize,
    ) -> SourceResult<HistoryPage> {
        let mut state = self.state();
        state.page_requests.push(PageRequest {
            peer_id: peer.id,
            offset,
            limit,
        });
        if state.failing_pages.contains(&(peer.id, offset)) {
            return Err(SourceError::unavailable(format!(
                "history of {} at offset {offset} refused",
                peer.id
            )));
        }

        let history = state
            .conversations
            .iter()
            .find(|(p, _)| p.id == peer.id)
            .map(|(_, history)| history)
            .ok_or_else(|| SourceError::not_found(format!("conversation {}", peer.id)))?;

        Ok(history.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn fetch_media(&self, kind: MediaKind, message: &RawMessage) -> SourceResult<PathBuf> {
        let (latency, fails) = {
            let mut state = self.state();
            state.media_requests.push(message.id);
            (
                state.media_latency.get(&message.id).copied(),
                state.failing_media.contains(&message.id),
            )
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if fails {
            return Err(SourceError::unavailable(format!(
                "download of message {} failed",
                message.id
            )));
        }

        let dir = self
            .staging_dir
            .as_ref()
            .ok_or_else(|| SourceError::unavailable("no staging directory"))?;
        let name = message
            .media
            .as_ref()
            .and_then(|m| m.file_name.clone())
            .unwrap_or_else(|| format!("{}.{}", message.id, default_extension(kind)));
        let path = dir.join(name);
        tokio::fs::write(&path, format!("{kind} of message {}", message.id)).await?;
        Ok(path)
    }
}
