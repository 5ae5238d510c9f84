// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applications: named event stores with a notification log

use crate::aggregate::{Aggregate, AggregateError};
use crate::config::ApplicationConfig;
use crate::event::StoredEvent;
use crate::notification::LocalNotificationLog;
use crate::recorder::{AggregateRecorder, ApplicationRecorder};
use crate::repository::{Repository, RepositoryError};
use crate::store::{EventStore, StoreError};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("snapshotting is not enabled for {0}")]
    SnapshotsDisabled(String),
}

impl ApplicationError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, ApplicationError::Store(e) if e.is_concurrency())
    }
}

/// Receives a prompt after an application records new events
pub trait PromptListener: Send + Sync {
    fn prompt(&self, leader: &str);
}

/// A named event store whose saves feed its notification log
pub struct Application<R: ?Sized> {
    name: String,
    events: EventStore<R>,
    snapshots: Option<EventStore<dyn AggregateRecorder>>,
    snapshot_interval: Option<u64>,
    log: LocalNotificationLog<R>,
    listeners: RwLock<Vec<Arc<dyn PromptListener>>>,
}

impl<R: ApplicationRecorder + ?Sized> Application<R> {
    pub fn new(config: &ApplicationConfig, recorder: Arc<R>) -> Self {
        Self {
            name: config.name.clone(),
            events: EventStore::new(Arc::clone(&recorder)),
            snapshots: None,
            snapshot_interval: config.snapshot_interval,
            log: LocalNotificationLog::new(recorder, config.section_size),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Keep snapshots in a separate recorder
    pub fn with_snapshots(mut self, recorder: Arc<dyn AggregateRecorder>) -> Self {
        self.snapshots = Some(EventStore::new(recorder));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> &EventStore<R> {
        &self.events
    }

    pub fn recorder(&self) -> &Arc<R> {
        self.events.recorder()
    }

    pub fn notification_log(&self) -> &LocalNotificationLog<R> {
        &self.log
    }

    pub fn repository(&self) -> Repository<'_, R> {
        let repository = Repository::new(&self.events);
        match &self.snapshots {
            Some(snapshots) => repository.with_snapshots(snapshots),
            None => repository,
        }
    }

    pub fn get<A: Aggregate>(&self, id: Uuid) -> Result<A, ApplicationError> {
        Ok(self.repository().get(id, None)?)
    }

    /// Record an aggregate's pending events
    ///
    /// On failure the events are put back as pending and nothing is
    /// recorded.
    pub fn save<A: Aggregate>(&self, aggregate: &mut A) -> Result<Vec<u64>, ApplicationError> {
        let pending = aggregate.collect_events();
        let stored = match self.events.encode(&pending) {
            Ok(stored) => stored,
            Err(e) => {
                aggregate.restore_pending(pending);
                return Err(e.into());
            }
        };
        let ids = match self.events.append(&stored) {
            Ok(ids) => ids,
            Err(e) => {
                aggregate.restore_pending(pending);
                return Err(e.into());
            }
        };
        tracing::debug!(
            application = %self.name,
            aggregate = %aggregate.id(),
            version = aggregate.version(),
            recorded = ids.len(),
            "saved"
        );

        if self.crossed_snapshot_interval(aggregate.version(), pending.len() as u64) {
            self.store_snapshot(aggregate);
        }
        if !ids.is_empty() {
            self.prompt_listeners();
        }
        Ok(ids)
    }

    /// Record stored events prepared elsewhere as one atomic batch
    pub fn save_stored(&self, events: &[StoredEvent]) -> Result<Vec<u64>, ApplicationError> {
        let ids = self.events.append(events)?;
        if !ids.is_empty() {
            self.prompt_listeners();
        }
        Ok(ids)
    }

    /// Snapshot an aggregate at the given version (latest when `None`)
    pub fn take_snapshot<A: Aggregate>(&self, id: Uuid, version: Option<u64>) -> Result<(), ApplicationError> {
        let Some(snapshots) = &self.snapshots else {
            return Err(ApplicationError::SnapshotsDisabled(self.name.clone()));
        };
        let aggregate: A = self.repository().get(id, version)?;
        let stored = snapshots
            .mapper()
            .encode_snapshot(&aggregate)
            .map_err(StoreError::from)?;
        match snapshots.append(&[stored]) {
            Ok(_) => Ok(()),
            Err(e) if e.is_concurrency() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn crossed_snapshot_interval(&self, version: u64, saved: u64) -> bool {
        match self.snapshot_interval {
            Some(interval) if interval > 0 && self.snapshots.is_some() => {
                version / interval > version.saturating_sub(saved) / interval
            }
            _ => false,
        }
    }

    fn store_snapshot<A: Aggregate>(&self, aggregate: &A) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        let result = snapshots
            .mapper()
            .encode_snapshot(aggregate)
            .map_err(StoreError::from)
            .and_then(|stored| snapshots.append(&[stored]));
        match result {
            Ok(_) => tracing::debug!(aggregate = %aggregate.id(), version = aggregate.version(), "snapshot taken"),
            Err(e) if e.is_concurrency() => {}
            Err(e) => tracing::warn!(aggregate = %aggregate.id(), error = %e, "snapshot failed"),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn PromptListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Tell listeners that new notifications are available
    pub fn prompt_listeners(&self) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener.prompt(&self.name);
        }
    }
}

#[cfg(test)]
#[path = "application_tests.rs"]
mod tests;
