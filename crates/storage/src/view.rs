// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only view that tails a journal written by another process

use crate::journal::{JournalReadError, JournalReader};
use crate::StorageError;
use herald_core::{
    AggregateRecorder, ApplicationRecorder, EventQuery, Notification, RecordError, RecordIndex,
    StoredEvent,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Tails a journal, picking up new commits before every read
///
/// The writing process owns the journal; the view never writes to it. An
/// incomplete last line is taken to be an append in flight and is retried
/// on the next read.
pub struct JournalView {
    reader: JournalReader,
    inner: Mutex<ViewState>,
}

#[derive(Default)]
struct ViewState {
    index: RecordIndex,
    /// Byte offset after the last applied entry
    offset: u64,
}

impl JournalView {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let view = Self {
            reader: JournalReader::open(path),
            inner: Mutex::new(ViewState::default()),
        };
        view.refresh()?;
        Ok(view)
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Apply commits appended since the last refresh
    ///
    /// Returns the number of commits applied.
    pub fn refresh(&self) -> Result<usize, StorageError> {
        let mut state = self.lock();
        Ok(self.refresh_locked(&mut state)?)
    }

    fn refresh_locked(&self, state: &mut ViewState) -> Result<usize, JournalReadError> {
        let len = match std::fs::metadata(self.reader.path()) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if len == state.offset {
            return Ok(0);
        }
        if len < state.offset {
            // The writer repaired its tail; rebuild from the start
            tracing::info!(path = %self.path().display(), "journal shrank, rebuilding view");
            *state = ViewState::default();
        }

        let mut entries = self.reader.entries_from(state.offset)?;
        let mut applied = 0;
        for entry in entries.by_ref() {
            match entry {
                Ok(entry) => {
                    state
                        .index
                        .apply(&entry.commit.events, entry.commit.tracking.as_ref());
                    applied += 1;
                }
                Err(JournalReadError::Incomplete { .. }) => break,
                Err(e) => {
                    tracing::warn!(path = %self.path().display(), error = %e, "journal view stopped at corrupt entry");
                    break;
                }
            }
        }
        state.offset = entries.last_valid_position();
        if applied > 0 {
            tracing::debug!(applied, offset = state.offset, "journal view refreshed");
        }
        Ok(applied)
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> Result<MutexGuard<'_, ViewState>, RecordError> {
        let mut state = self.lock();
        self.refresh_locked(&mut state)
            .map_err(|e| RecordError::Persistence(e.to_string()))?;
        Ok(state)
    }
}

impl AggregateRecorder for JournalView {
    fn insert_events(&self, _events: &[StoredEvent]) -> Result<Vec<u64>, RecordError> {
        Err(RecordError::Persistence(format!(
            "{} is opened read-only",
            self.path().display()
        )))
    }

    fn select_events(
        &self,
        originator_id: Uuid,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, RecordError> {
        Ok(self.current()?.index.select_events(originator_id, query))
    }
}

impl ApplicationRecorder for JournalView {
    fn select_notifications(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RecordError> {
        Ok(self.current()?.index.select_notifications(start, limit, topics))
    }

    fn max_notification_id(&self) -> Result<u64, RecordError> {
        Ok(self.current()?.index.max_notification_id())
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
