//! Offline source backed by a JSON dump.
//!
//! A dump is a snapshot of what the service would answer:
//!
//! ```json
//! {
//!   "conversations": [
//!     {
//!       "peer": {"id": 1, "kind": "group", "name": "My Chat"},
//!       "messages": [
//!         {"id": 3, "date": 1705314720, "text": "newest"},
//!         null,
//!         {"id": 1, "date": 1705314600, "media": {"type": "photo", "location": "media/1.jpg"}}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `messages` is in paging order. A media `location` is a file path relative
//! to the dump file; downloading it copies the file into a private staging
//! directory that lives as long as the source. Absolute locations and ones
//! that climb out with `..` are rejected.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{Result, SourceError};
use crate::peer::Peer;
use crate::record::{MediaKind, RawMessage};

use super::traits::{HistoryPage, HistorySource, SourceResult};

/// One conversation of a dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpConversation {
    pub peer: Peer,
    #[serde(default)]
    pub messages: HistoryPage,
}

/// Top-level dump document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DumpFile {
    #[serde(default)]
    pub conversations: Vec<DumpConversation>,
}

/// [`HistorySource`] reading from a [`DumpFile`] on disk.
pub struct DumpSource {
    dump: DumpFile,
    root: PathBuf,
    staging: TempDir,
}

impl DumpSource {
    /// Reads and parses a dump file.
    pub async fn open(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let dump: DumpFile = serde_json::from_str(&text)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_dump(dump, root)
    }

    /// Wraps an already parsed dump; media locations resolve against `root`.
    pub fn from_dump(dump: DumpFile, root: impl Into<PathBuf>) -> Result<Self> {
        let staging = tempfile::Builder::new().prefix("chatvault-").tempdir()?;
        Ok(Self {
            dump,
            root: root.into(),
            staging,
        })
    }

    fn history(&self, peer: &Peer) -> SourceResult<&HistoryPage> {
        self.dump
            .conversations
            .iter()
            .find(|c| c.peer.id == peer.id)
            .map(|c| &c.messages)
            .ok_or_else(|| SourceError::not_found(format!("conversation {}", peer.id)))
    }
}

#[async_trait]
impl HistorySource for DumpSource {
    async fn list_conversations(&self) -> SourceResult<Vec<Peer>> {
        Ok(self
            .dump
            .conversations
            .iter()
            .map(|c| c.peer.clone())
            .collect())
    }

    async fn fetch_history_page(
        &self,
        peer: &Peer,
        offset: usize,
        limit: usize,
    ) -> SourceResult<HistoryPage> {
        let history = self.history(peer)?;
        Ok(history.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn fetch_media(&self, kind: MediaKind, message: &RawMessage) -> SourceResult<PathBuf> {
        let location = message
            .media
            .as_ref()
            .and_then(|m| m.location.as_deref())
            .ok_or_else(|| SourceError::not_found(format!("{kind} of message {}", message.id)))?;

        let relative = Path::new(location);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SourceError::rejected(format!(
                "'{location}' of message {} is not inside the dump directory",
                message.id
            )));
        }

        let source = self.root.join(relative);
        let file_name = Path::new(location)
            .file_name()
            .ok_or_else(|| SourceError::not_found(format!("media location '{location}'")))?;
        let staged = self
            .staging
            .path()
            .join(format!("{}_{}", message.id, file_name.to_string_lossy()));

        tokio::fs::copy(&source, &staged).await?;
        debug!(message_id = message.id, %kind, path = %staged.display(), "staged media");
        Ok(staged)
    }
}
