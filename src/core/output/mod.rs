//! Output writers.
//!
//! Archives are written as JSON Lines: one JSON object per line, UTF-8,
//! newline-terminated.
//!
//! - [`JsonlSink`] - append-only per-conversation writer
//! - [`to_jsonl_line`] - single record to string

mod jsonl_writer;

pub use jsonl_writer::{JsonlSink, to_jsonl_line};
