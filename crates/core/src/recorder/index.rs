// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory record index shared by recorder implementations
//!
//! The index holds aggregate sequences, the total order and tracking rows.
//! Callers check a batch first and apply it only when the check passes, so
//! a rejected batch leaves the index untouched.

use super::{EventQuery, RecordError};
use crate::event::{Notification, StoredEvent, Tracking};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// Records indexed for constraint checks and queries
#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    sequences: HashMap<Uuid, BTreeMap<u64, StoredEvent>>,
    /// Position `n - 1` holds the event for notification id `n`
    order: Vec<(Uuid, u64)>,
    tracking: HashMap<String, BTreeSet<u64>>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the batch if any version is already taken, in the index or
    /// earlier in the same batch
    pub fn check_events(&self, events: &[StoredEvent]) -> Result<(), RecordError> {
        let mut seen = HashSet::with_capacity(events.len());
        for event in events {
            let key = (event.originator_id, event.originator_version);
            let taken = self
                .sequences
                .get(&event.originator_id)
                .is_some_and(|seq| seq.contains_key(&event.originator_version));
            if taken || !seen.insert(key) {
                return Err(RecordError::Concurrency {
                    originator_id: event.originator_id,
                    originator_version: event.originator_version,
                });
            }
        }
        Ok(())
    }

    /// Apply a batch that has already passed [`RecordIndex::check_events`]
    ///
    /// Returns the notification ids assigned to the events, in batch order.
    pub fn apply(&mut self, events: &[StoredEvent], tracking: Option<&Tracking>) -> Vec<u64> {
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            self.sequences
                .entry(event.originator_id)
                .or_default()
                .insert(event.originator_version, event.clone());
            self.order
                .push((event.originator_id, event.originator_version));
            ids.push(self.order.len() as u64);
        }
        if let Some(tracking) = tracking {
            self.tracking
                .entry(tracking.application_name.clone())
                .or_default()
                .insert(tracking.notification_id);
        }
        ids
    }

    pub fn select_events(&self, originator_id: Uuid, query: &EventQuery) -> Vec<StoredEvent> {
        let Some(seq) = self.sequences.get(&originator_id) else {
            return Vec::new();
        };
        let matching = seq.values().filter(|e| query.contains(e.originator_version));
        let limit = query.limit.unwrap_or(usize::MAX);
        if query.desc {
            matching.rev().take(limit).cloned().collect()
        } else {
            matching.take(limit).cloned().collect()
        }
    }

    pub fn select_notifications(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Vec<Notification> {
        let skip = start.saturating_sub(1) as usize;
        self.order
            .iter()
            .enumerate()
            .skip(skip)
            .filter_map(|(pos, (id, version))| {
                let event = self.sequences.get(id)?.get(version)?;
                Some(event.clone().into_notification(pos as u64 + 1))
            })
            .filter(|n| n.matches_topics(topics))
            .take(limit)
            .collect()
    }

    pub fn max_notification_id(&self) -> u64 {
        self.order.len() as u64
    }

    pub fn max_tracking_id(&self, application_name: &str) -> u64 {
        self.tracking
            .get(application_name)
            .and_then(|ids| ids.last().copied())
            .unwrap_or(0)
    }

    pub fn has_tracking_id(&self, application_name: &str, notification_id: u64) -> bool {
        self.tracking
            .get(application_name)
            .is_some_and(|ids| ids.contains(&notification_id))
    }

    /// Total number of stored events
    pub fn event_count(&self) -> usize {
        self.order.len()
    }
}
