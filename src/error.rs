//! Unified error types for chatvault.
//!
//! This module provides a single [`VaultError`] enum for everything that can
//! stop a backup run, plus [`SourceError`], the error type reported by a
//! [`HistorySource`](crate::source::HistorySource).
//!
//! # Error Handling Philosophy
//!
//! - **Fatal** conditions (a failed history page, a failed dialog listing,
//!   a broken output file) surface as `VaultError` and halt the run
//! - **Recoverable** conditions (a failed media download, a message without
//!   a timestamp) never become errors; they are reported through
//!   [`BackupEvent`](crate::events::BackupEvent)s and the run continues

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for chatvault operations.
///
/// # Example
///
/// ```rust
/// use chatvault::error::Result;
/// use chatvault::MessageRecord;
///
/// fn my_function() -> Result<Vec<MessageRecord>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, VaultError>;

/// The error type for all chatvault operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VaultError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The backup directory cannot be created
    /// - The output file cannot be opened or written
    /// - Disk is full
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/parsing error.
    ///
    /// Raised when a record cannot be encoded or a dump file is malformed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file is not valid TOML.
    #[error("Failed to read config{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Config {
        /// The underlying TOML error
        #[source]
        source: toml::de::Error,
        /// The config file path, if available
        path: Option<PathBuf>,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig {
        /// Name of the offending option
        field: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// A history page could not be fetched.
    ///
    /// This is fatal for the whole run: the transport layer is expected to
    /// have retried already, so there is nothing left to try here.
    #[error("Failed to fetch history of '{conversation}' (offset {offset}, limit {limit}): {source}")]
    FatalTransport {
        /// Display name of the conversation being backed up
        conversation: String,
        /// Offset of the failed page request
        offset: usize,
        /// Limit of the failed page request
        limit: usize,
        /// What the source reported
        #[source]
        source: SourceError,
    },

    /// The dialog list could not be fetched.
    #[error("Failed to list conversations: {0}")]
    DialogList(#[source] SourceError),
}

/// Errors reported by a [`HistorySource`](crate::source::HistorySource).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The remote end refused or failed the request.
    #[error("request failed: {0}")]
    Unavailable(String),

    /// The requested conversation or media does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The source refused to serve a path outside its own data.
    #[error("rejected media location: {0}")]
    Rejected(String),

    /// IO error while staging data locally
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl VaultError {
    /// Creates a fatal transport error for a failed page request.
    pub fn fatal_transport(
        conversation: impl Into<String>,
        offset: usize,
        limit: usize,
        source: SourceError,
    ) -> Self {
        VaultError::FatalTransport {
            conversation: conversation.into(),
            offset,
            limit,
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        VaultError::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    /// Creates a config parse error.
    pub fn config(source: toml::de::Error, path: Option<PathBuf>) -> Self {
        VaultError::Config { source, path }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, VaultError::Io(_))
    }

    /// Returns `true` if a history page fetch failed.
    pub fn is_fatal_transport(&self) -> bool {
        matches!(self, VaultError::FatalTransport { .. })
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            VaultError::Config { .. } | VaultError::InvalidConfig { .. }
        )
    }
}

impl SourceError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        SourceError::Unavailable(message.into())
    }

    /// Creates a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        SourceError::NotFound(message.into())
    }

    /// Creates a `Rejected` error.
    pub fn rejected(message: impl Into<String>) -> Self {
        SourceError::Rejected(message.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
