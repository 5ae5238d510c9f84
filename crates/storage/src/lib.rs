// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herald-storage: durable file-backed recorder
//!
//! ```text
//! Commit → JournalEntry → JournalWriter → disk (journal.jsonl)
//!                                              ↓
//!                              JournalReader → replay → RecordIndex
//! ```
//!
//! - Every commit is followed by `fsync()` before returning
//! - Checksums detect corruption
//! - A torn tail (crash during append) is detected on open and truncated
//! - [`JournalView`] tails a journal owned by another process, read-only

pub mod journal;
mod recorder;
mod view;

pub use journal::{Commit, JournalEntry, JournalReadError, JournalReader, JournalWriter};
pub use recorder::FileRecorder;
pub use view::JournalView;

use thiserror::Error;

/// Errors from journal storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("journal read error: {0}")]
    Read(#[from] JournalReadError),
}

impl From<StorageError> for herald_core::RecordError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => herald_core::RecordError::Io(e),
            StorageError::Json(e) => herald_core::RecordError::Json(e),
            StorageError::Read(e) => herald_core::RecordError::Persistence(e.to_string()),
        }
    }
}
