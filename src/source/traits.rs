//! The external collaborator seam.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::peer::Peer;
use crate::record::{MediaKind, RawMessage};

/// Result type of every [`HistorySource`] operation.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// One page of history.
///
/// Slots may be `None` where the service returned an empty or deleted
/// message. The order is exactly what the service returned and is preserved
/// all the way to the output file.
pub type HistoryPage = Vec<Option<RawMessage>>;

/// Asynchronous access to a messaging service.
///
/// The backup core awaits at most one of these calls at a time, so
/// implementations don't need internal request ordering.
///
/// # Example
///
/// ```rust
/// use chatvault::source::{HistorySource, MemorySource};
/// use chatvault::peer::Peer;
/// use chatvault::record::RawMessage;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MemorySource::new();
/// let chat = Peer::group(1, "Team");
/// source.add_conversation(chat.clone(), (1..=3).map(|id| Some(RawMessage::new(id))).collect());
///
/// let page = source.fetch_history_page(&chat, 0, 2).await.unwrap();
/// assert_eq!(page.len(), 2);
/// # }
/// ```
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Returns every conversation visible to the account.
    async fn list_conversations(&self) -> SourceResult<Vec<Peer>>;

    /// Returns up to `limit` history slots starting `offset` slots into the
    /// conversation's history.
    ///
    /// A page shorter than `limit` means the history is exhausted.
    async fn fetch_history_page(
        &self,
        peer: &Peer,
        offset: usize,
        limit: usize,
    ) -> SourceResult<HistoryPage>;

    /// Downloads the media of `message` into a temporary file.
    ///
    /// The returned file belongs to the caller, which moves it away.
    async fn fetch_media(&self, kind: MediaKind, message: &RawMessage) -> SourceResult<PathBuf>;
}

#[async_trait]
impl<T: HistorySource + ?Sized> HistorySource for Arc<T> {
    async fn list_conversations(&self) -> SourceResult<Vec<Peer>> {
        (**self).list_conversations().await
    }

    async fn fetch_history_page(
        &self,
        peer: &Peer,
        offset: usize,
        limit: usize,
    ) -> SourceResult<HistoryPage> {
        (**self).fetch_history_page(peer, offset, limit).await
    }

    async fn fetch_media(&self, kind: MediaKind, message: &RawMessage) -> SourceResult<PathBuf> {
        (**self).fetch_media(kind, message).await
    }
}
