// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate repository

use crate::aggregate::{Aggregate, AggregateError};
use crate::recorder::{AggregateRecorder, EventQuery};
use crate::store::{EventStore, StoreError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("aggregate not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Reconstructs aggregates from an event store, optionally starting from
/// the latest snapshot
pub struct Repository<'a, R: ?Sized> {
    events: &'a EventStore<R>,
    snapshots: Option<&'a EventStore<dyn AggregateRecorder>>,
}

impl<'a, R: AggregateRecorder + ?Sized> Repository<'a, R> {
    pub fn new(events: &'a EventStore<R>) -> Self {
        Self {
            events,
            snapshots: None,
        }
    }

    pub fn with_snapshots(mut self, snapshots: &'a EventStore<dyn AggregateRecorder>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Load an aggregate
    ///
    /// `version` is the number of events to apply; `None` loads the latest
    /// state.
    pub fn get<A: Aggregate>(&self, id: Uuid, version: Option<u64>) -> Result<A, RepositoryError> {
        let lte = match version {
            Some(0) => return Err(RepositoryError::NotFound(id)),
            Some(v) => Some(v - 1),
            None => None,
        };

        let mut state: Option<A> = self.latest_snapshot(id, lte)?;
        let gt = state.as_ref().and_then(|a| a.version().checked_sub(1));

        let query = EventQuery { gt, lte, ..EventQuery::default() };
        for envelope in self.events.get::<A::Event>(id, &query)? {
            state = Some(A::mutate(state, &envelope?)?);
        }

        state.ok_or(RepositoryError::NotFound(id))
    }

    /// Whether any event exists for the aggregate
    pub fn contains(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self
            .events
            .recorder()
            .max_version(id)
            .map_err(StoreError::from)?
            .is_some())
    }

    fn latest_snapshot<A: Aggregate>(
        &self,
        id: Uuid,
        lte: Option<u64>,
    ) -> Result<Option<A>, RepositoryError> {
        let Some(snapshots) = self.snapshots else {
            return Ok(None);
        };
        let query = EventQuery::latest().with_lte(lte);
        let stored = snapshots
            .recorder()
            .select_events(id, &query)
            .map_err(StoreError::from)?;
        match stored.first() {
            Some(s) => Ok(Some(
                snapshots
                    .mapper()
                    .decode_snapshot::<A>(s)
                    .map_err(StoreError::from)?,
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
