//! Configuration types for a backup run.
//!
//! This module provides plain configuration structs for library usage,
//! without any CLI framework dependencies. The same structs are loaded from
//! a TOML file by the binary.
//!
//! # Example
//!
//! ```rust
//! use chatvault::config::{BackupConfig, MediaConfig};
//!
//! let config = BackupConfig::new()
//!     .with_target("My Chat")
//!     .with_chunk_size(50)
//!     .with_history_limit(1_000)
//!     .with_media(MediaConfig::new().with_photos(true))
//!     .with_backup_dir("./archive");
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! # TOML
//!
//! ```toml
//! targets = ["My Chat", "Family"]
//! chunk_size = 100
//! request_delay_ms = 1000
//! media_delay_ms = 1000
//! history_limit = 0
//! backup_dir = "./json"
//!
//! [media]
//! photos = true
//! documents = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::record::MediaKind;

/// Which media kinds get downloaded.
///
/// Photos are gated separately from everything else; documents, videos and
/// audio share one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Download photos (default: false)
    pub photos: bool,

    /// Download documents, videos and audio (default: false)
    pub documents: bool,
}

impl MediaConfig {
    /// Creates a configuration with all downloads disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables every downloadable kind.
    pub fn all() -> Self {
        Self {
            photos: true,
            documents: true,
        }
    }

    #[must_use]
    pub fn with_photos(mut self, enabled: bool) -> Self {
        self.photos = enabled;
        self
    }

    #[must_use]
    pub fn with_documents(mut self, enabled: bool) -> Self {
        self.documents = enabled;
        self
    }

    /// Returns `true` if at least one kind is enabled.
    pub fn is_enabled(&self) -> bool {
        self.photos || self.documents
    }

    /// Returns `true` if media of this kind should be downloaded.
    pub fn allows(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Photo => self.photos,
            MediaKind::Document | MediaKind::Video | MediaKind::Audio => self.documents,
            MediaKind::None => false,
        }
    }
}

/// Settings for one backup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Conversation name substrings to back up; empty selects everything.
    pub targets: Vec<String>,

    /// Messages requested per history page (default: 100)
    pub chunk_size: usize,

    /// Pause after every history page, in milliseconds (default: 1000)
    pub request_delay_ms: u64,

    /// Pause after every media download attempt, in milliseconds (default: 1000)
    pub media_delay_ms: u64,

    /// Maximum messages per conversation, 0 for unlimited (default: 0)
    pub history_limit: usize,

    /// Directory receiving the `.jsonl` files and media folders (default: `./json`)
    pub backup_dir: PathBuf,

    /// Media download switches
    pub media: MediaConfig,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            chunk_size: 100,
            request_delay_ms: 1_000,
            media_delay_ms: 1_000,
            history_limit: 0,
            backup_dir: PathBuf::from("./json"),
            media: MediaConfig::default(),
        }
    }
}

impl BackupConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from TOML text.
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VaultError::config(e, None))
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| VaultError::config(e, Some(path.to_path_buf())))
    }

    /// Adds a target name substring.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Replaces the target list.
    #[must_use]
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub fn with_media_delay(mut self, delay: Duration) -> Self {
        self.media_delay_ms = duration_ms(delay);
        self
    }

    /// Disables both rate-limit pauses.
    #[must_use]
    pub fn without_delays(self) -> Self {
        self.with_request_delay(Duration::ZERO)
            .with_media_delay(Duration::ZERO)
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaConfig) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn media_delay(&self) -> Duration {
        Duration::from_millis(self.media_delay_ms)
    }

    /// Returns the positive history limit, or `None` when unlimited.
    pub fn limit(&self) -> Option<usize> {
        (self.history_limit > 0).then_some(self.history_limit)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(VaultError::invalid_config(
                "chunk_size",
                "must be greater than zero",
            ));
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(VaultError::invalid_config(
                "backup_dir",
                "must not be empty",
            ));
        }
        if self.targets.iter().any(|t| t.is_empty()) {
            return Err(VaultError::invalid_config(
                "targets",
                "target names must not be empty",
            ));
        }
        Ok(())
    }
}

fn duration_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
