// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorder contracts
//!
//! A recorder is the durable storage adapter behind an event store. Three
//! layers of contract build on each other:
//!
//! ```text
//! AggregateRecorder    insert/select per-aggregate sequences
//!        ↓
//! ApplicationRecorder  + total order (notification ids)
//!        ↓
//! ProcessRecorder      + tracking rows written atomically with events
//! ```
//!
//! Uniqueness of `(originator_id, originator_version)` is the optimistic
//! concurrency control constraint. Uniqueness of `(application_name,
//! notification_id)` makes upstream processing idempotent.

mod index;
mod memory;
mod traced;

pub use index::RecordIndex;
pub use memory::MemoryRecorder;
pub use traced::TracedRecorder;

use crate::event::{Notification, StoredEvent, Tracking};
use thiserror::Error;
use uuid::Uuid;

/// Errors from recorder operations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("version {originator_version} of {originator_id} is already recorded")]
    Concurrency {
        originator_id: Uuid,
        originator_version: u64,
    },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecordError {
    /// Whether the caller may re-read current state and retry
    pub fn is_concurrency(&self) -> bool {
        matches!(self, RecordError::Concurrency { .. })
    }
}

/// Result of an atomic insert of events plus a tracking row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Events and tracking row were written; carries the notification ids
    Recorded(Vec<u64>),
    /// The tracking row already existed; nothing was written
    AlreadyProcessed,
}

/// Bounds for selecting events of one aggregate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Only versions strictly greater than this
    pub gt: Option<u64>,
    /// Only versions less than or equal to this
    pub lte: Option<u64>,
    /// Return highest versions first
    pub desc: bool,
    /// Maximum number of events to return
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Every event, ascending
    pub fn all() -> Self {
        Self::default()
    }

    /// Events after the given version
    pub fn after(version: u64) -> Self {
        Self {
            gt: Some(version),
            ..Self::default()
        }
    }

    /// Events up to and including the given version
    pub fn up_to(version: u64) -> Self {
        Self {
            lte: Some(version),
            ..Self::default()
        }
    }

    /// Only the most recent event
    pub fn latest() -> Self {
        Self {
            desc: true,
            limit: Some(1),
            ..Self::default()
        }
    }

    pub fn with_gt(mut self, gt: Option<u64>) -> Self {
        self.gt = gt;
        self
    }

    pub fn with_lte(mut self, lte: Option<u64>) -> Self {
        self.lte = lte;
        self
    }

    /// Whether a version falls inside the bounds
    pub fn contains(&self, version: u64) -> bool {
        self.gt.map_or(true, |gt| version > gt) && self.lte.map_or(true, |lte| version <= lte)
    }
}

/// Storage for aggregate event sequences
pub trait AggregateRecorder: Send + Sync {
    /// Atomically insert a batch of events
    ///
    /// Fails with [`RecordError::Concurrency`] when any `(originator_id,
    /// originator_version)` already exists; nothing is written in that case.
    /// Returns notification ids when the recorder keeps a total order.
    fn insert_events(&self, events: &[StoredEvent]) -> Result<Vec<u64>, RecordError>;

    /// Select events of one aggregate ordered by version
    fn select_events(
        &self,
        originator_id: Uuid,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, RecordError>;

    /// Highest recorded version of an aggregate, if any
    fn max_version(&self, originator_id: Uuid) -> Result<Option<u64>, RecordError> {
        Ok(self
            .select_events(originator_id, &EventQuery::latest())?
            .first()
            .map(|e| e.originator_version))
    }
}

/// Storage that additionally keeps an application-wide total order
pub trait ApplicationRecorder: AggregateRecorder {
    /// Select notifications with `id >= start`, at most `limit` of them
    ///
    /// An empty topic list selects every topic.
    fn select_notifications(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RecordError>;

    /// Id of the latest notification (0 when the log is empty)
    fn max_notification_id(&self) -> Result<u64, RecordError>;
}

/// Storage for process applications
pub trait ProcessRecorder: ApplicationRecorder {
    /// Atomically insert events together with a tracking row
    ///
    /// Returns [`CommitOutcome::AlreadyProcessed`] without writing anything
    /// when the tracking row exists.
    fn insert_events_with_tracking(
        &self,
        events: &[StoredEvent],
        tracking: &Tracking,
    ) -> Result<CommitOutcome, RecordError>;

    /// Highest notification id processed from the named upstream (0 if none)
    fn max_tracking_id(&self, application_name: &str) -> Result<u64, RecordError>;

    /// Whether a specific upstream notification has been processed
    fn has_tracking_id(
        &self,
        application_name: &str,
        notification_id: u64,
    ) -> Result<bool, RecordError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
