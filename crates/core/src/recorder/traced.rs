// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced recorder wrapper for consistent observability

use super::{
    AggregateRecorder, ApplicationRecorder, CommitOutcome, EventQuery, ProcessRecorder,
    RecordError,
};
use crate::event::{Notification, StoredEvent, Tracking};
use uuid::Uuid;

/// Wrapper that adds tracing to any recorder
#[derive(Clone)]
pub struct TracedRecorder<R> {
    inner: R,
}

impl<R> TracedRecorder<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: AggregateRecorder> AggregateRecorder for TracedRecorder<R> {
    fn insert_events(&self, events: &[StoredEvent]) -> Result<Vec<u64>, RecordError> {
        let span = tracing::debug_span!("recorder.insert_events", count = events.len());
        let _guard = span.enter();

        let start = std::time::Instant::now();
        let result = self.inner.insert_events(events);
        let elapsed_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(ids) => tracing::debug!(elapsed_us, last_id = ids.last().copied(), "inserted"),
            Err(e) if e.is_concurrency() => tracing::debug!(error = %e, "version conflict"),
            Err(e) => tracing::error!(elapsed_us, error = %e, "insert failed"),
        }

        result
    }

    fn select_events(
        &self,
        originator_id: Uuid,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, RecordError> {
        let result = self.inner.select_events(originator_id, query);
        tracing::trace!(
            %originator_id,
            found = result.as_ref().map(|e| e.len()).ok(),
            "selected events"
        );
        result
    }
}

impl<R: ApplicationRecorder> ApplicationRecorder for TracedRecorder<R> {
    fn select_notifications(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RecordError> {
        let result = self.inner.select_notifications(start, limit, topics);
        match &result {
            Ok(items) => tracing::trace!(start, limit, found = items.len(), "selected notifications"),
            Err(e) => tracing::error!(start, limit, error = %e, "select notifications failed"),
        }
        result
    }

    fn max_notification_id(&self) -> Result<u64, RecordError> {
        self.inner.max_notification_id()
    }
}

impl<R: ProcessRecorder> ProcessRecorder for TracedRecorder<R> {
    fn insert_events_with_tracking(
        &self,
        events: &[StoredEvent],
        tracking: &Tracking,
    ) -> Result<CommitOutcome, RecordError> {
        let span = tracing::debug_span!(
            "recorder.commit",
            upstream = %tracking.application_name,
            notification_id = tracking.notification_id,
            count = events.len()
        );
        let _guard = span.enter();

        let result = self.inner.insert_events_with_tracking(events, tracking);
        match &result {
            Ok(CommitOutcome::Recorded(_)) => tracing::debug!("committed"),
            Ok(CommitOutcome::AlreadyProcessed) => tracing::debug!("already processed, skipped"),
            Err(e) if e.is_concurrency() => tracing::debug!(error = %e, "version conflict"),
            Err(e) => tracing::error!(error = %e, "commit failed"),
        }
        result
    }

    fn max_tracking_id(&self, application_name: &str) -> Result<u64, RecordError> {
        self.inner.max_tracking_id(application_name)
    }

    fn has_tracking_id(
        &self,
        application_name: &str,
        notification_id: u64,
    ) -> Result<bool, RecordError> {
        self.inner.has_tracking_id(application_name, notification_id)
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
