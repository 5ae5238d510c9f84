// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory recorder

use super::{
    AggregateRecorder, ApplicationRecorder, CommitOutcome, EventQuery, ProcessRecorder,
    RecordError, RecordIndex,
};
use crate::event::{Notification, StoredEvent, Tracking};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Recorder that keeps everything in process memory
///
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryRecorder {
    index: Arc<RwLock<RecordIndex>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events held
    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .event_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AggregateRecorder for MemoryRecorder {
    fn insert_events(&self, events: &[StoredEvent]) -> Result<Vec<u64>, RecordError> {
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        index.check_events(events)?;
        Ok(index.apply(events, None))
    }

    fn select_events(
        &self,
        originator_id: Uuid,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, RecordError> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.select_events(originator_id, query))
    }
}

impl ApplicationRecorder for MemoryRecorder {
    fn select_notifications(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RecordError> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.select_notifications(start, limit, topics))
    }

    fn max_notification_id(&self) -> Result<u64, RecordError> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.max_notification_id())
    }
}

impl ProcessRecorder for MemoryRecorder {
    fn insert_events_with_tracking(
        &self,
        events: &[StoredEvent],
        tracking: &Tracking,
    ) -> Result<CommitOutcome, RecordError> {
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        if index.has_tracking_id(&tracking.application_name, tracking.notification_id) {
            return Ok(CommitOutcome::AlreadyProcessed);
        }
        index.check_events(events)?;
        Ok(CommitOutcome::Recorded(index.apply(events, Some(tracking))))
    }

    fn max_tracking_id(&self, application_name: &str) -> Result<u64, RecordError> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.max_tracking_id(application_name))
    }

    fn has_tracking_id(
        &self,
        application_name: &str,
        notification_id: u64,
    ) -> Result<bool, RecordError> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.has_tracking_id(application_name, notification_id))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
