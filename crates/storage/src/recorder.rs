// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorder backed by the commit journal

use crate::journal::{Commit, JournalReader, JournalWriter};
use crate::StorageError;
use herald_core::{
    AggregateRecorder, ApplicationRecorder, CommitOutcome, EventQuery, Notification,
    ProcessRecorder, RecordError, RecordIndex, StoredEvent, Tracking,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Durable recorder: every commit is one fsync'd journal line
///
/// The full record set is replayed into memory on open. Constraint checks,
/// the journal append and the index update all happen under one lock, so a
/// batch is either journaled and indexed or not at all.
pub struct FileRecorder {
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    writer: JournalWriter,
    index: RecordIndex,
}

impl FileRecorder {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_machine_id(path, &Uuid::new_v4().to_string())
    }

    pub fn open_with_machine_id(path: &Path, machine_id: &str) -> Result<Self, StorageError> {
        let reader = JournalReader::open(path);
        let mut index = RecordIndex::new();
        let mut replayed = 0u64;
        let mut corrupt = false;

        for entry in reader.entries()? {
            match entry {
                Ok(entry) => {
                    let commit = entry.commit;
                    index.apply(&commit.events, commit.tracking.as_ref());
                    replayed += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stopping journal replay at corrupt entry");
                    corrupt = true;
                    break;
                }
            }
        }

        if corrupt {
            reader.repair()?;
        }

        let writer = JournalWriter::open(path, machine_id)?;
        tracing::info!(
            path = %path.display(),
            commits = replayed,
            events = index.event_count(),
            "opened journal"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { writer, index }),
        })
    }

    /// Truncate a journal's corrupt tail without opening it
    pub fn repair(path: &Path) -> Result<u64, StorageError> {
        Ok(JournalReader::open(path).repair()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of events recorded
    pub fn len(&self) -> usize {
        self.lock().index.event_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn commit(inner: &mut Inner, events: &[StoredEvent], tracking: Option<&Tracking>) -> Result<Vec<u64>, RecordError> {
        inner.index.check_events(events)?;
        if events.is_empty() && tracking.is_none() {
            return Ok(Vec::new());
        }
        inner
            .writer
            .append(Commit::new(events.to_vec(), tracking.cloned()))?;
        Ok(inner.index.apply(events, tracking))
    }
}

impl AggregateRecorder for FileRecorder {
    fn insert_events(&self, events: &[StoredEvent]) -> Result<Vec<u64>, RecordError> {
        let mut inner = self.lock();
        Self::commit(&mut inner, events, None)
    }

    fn select_events(
        &self,
        originator_id: Uuid,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, RecordError> {
        Ok(self.lock().index.select_events(originator_id, query))
    }
}

impl ApplicationRecorder for FileRecorder {
    fn select_notifications(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RecordError> {
        Ok(self.lock().index.select_notifications(start, limit, topics))
    }

    fn max_notification_id(&self) -> Result<u64, RecordError> {
        Ok(self.lock().index.max_notification_id())
    }
}

impl ProcessRecorder for FileRecorder {
    fn insert_events_with_tracking(
        &self,
        events: &[StoredEvent],
        tracking: &Tracking,
    ) -> Result<CommitOutcome, RecordError> {
        let mut inner = self.lock();
        if inner
            .index
            .has_tracking_id(&tracking.application_name, tracking.notification_id)
        {
            return Ok(CommitOutcome::AlreadyProcessed);
        }
        Self::commit(&mut inner, events, Some(tracking)).map(CommitOutcome::Recorded)
    }

    fn max_tracking_id(&self, application_name: &str) -> Result<u64, RecordError> {
        Ok(self.lock().index.max_tracking_id(application_name))
    }

    fn has_tracking_id(
        &self,
        application_name: &str,
        notification_id: u64,
    ) -> Result<bool, RecordError> {
        Ok(self
            .lock()
            .index
            .has_tracking_id(application_name, notification_id))
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
