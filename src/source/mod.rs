//! Where conversations and their history come from.
//!
//! The backup core never talks to the messaging service directly. It goes
//! through the [`HistorySource`] trait, which models the three asynchronous
//! operations of the service API:
//!
//! - [`list_conversations`](HistorySource::list_conversations) — one-shot dialog listing
//! - [`fetch_history_page`](HistorySource::fetch_history_page) — one page of raw messages
//! - [`fetch_media`](HistorySource::fetch_media) — download into a temporary file
//!
//! # Implementations
//!
//! | Source | Use |
//! |--------|-----|
//! | [`MemorySource`] | scripted in-memory source with request recording, for tests |
//! | [`DumpSource`] | offline JSON dump, used by the `chatvault` binary |
//!
//! A live transport binding implements the same trait outside this crate.

#[cfg(feature = "dump-source")]
mod dump;
mod memory;
mod traits;

#[cfg(feature = "dump-source")]
pub use dump::{DumpConversation, DumpFile, DumpSource};
pub use memory::{MemorySource, PageRequest};
pub use traits::{HistoryPage, HistorySource, SourceResult};
