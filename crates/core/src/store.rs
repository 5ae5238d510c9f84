// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event store: domain events in, domain events out

use crate::aggregate::{DomainEvent, Envelope};
use crate::event::StoredEvent;
use crate::mapper::{Mapper, MapperError};
use crate::recorder::{AggregateRecorder, EventQuery, RecordError};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version {originator_version} of {originator_id} is already recorded")]
    Concurrency {
        originator_id: Uuid,
        originator_version: u64,
    },
    #[error("recorder error: {0}")]
    Record(RecordError),
    #[error("mapper error: {0}")]
    Mapper(#[from] MapperError),
}

impl StoreError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, StoreError::Concurrency { .. })
    }
}

impl From<RecordError> for StoreError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Concurrency {
                originator_id,
                originator_version,
            } => StoreError::Concurrency {
                originator_id,
                originator_version,
            },
            other => StoreError::Record(other),
        }
    }
}

/// Maps domain events through a [`Mapper`] into a recorder
pub struct EventStore<R: ?Sized> {
    mapper: Mapper,
    recorder: Arc<R>,
}

impl<R: ?Sized> Clone for EventStore<R> {
    fn clone(&self) -> Self {
        Self {
            mapper: self.mapper,
            recorder: Arc::clone(&self.recorder),
        }
    }
}

impl<R: AggregateRecorder + ?Sized> EventStore<R> {
    pub fn new(recorder: Arc<R>) -> Self {
        Self {
            mapper: Mapper,
            recorder,
        }
    }

    pub fn recorder(&self) -> &Arc<R> {
        &self.recorder
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Encode and atomically record domain events
    pub fn put<E: DomainEvent>(&self, events: &[Envelope<E>]) -> Result<Vec<u64>, StoreError> {
        let stored = self.encode(events)?;
        self.append(&stored)
    }

    pub fn encode<E: DomainEvent>(&self, events: &[Envelope<E>]) -> Result<Vec<StoredEvent>, StoreError> {
        events
            .iter()
            .map(|e| self.mapper.encode(e).map_err(StoreError::from))
            .collect()
    }

    /// Record already-encoded events as one atomic batch
    pub fn append(&self, events: &[StoredEvent]) -> Result<Vec<u64>, StoreError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.recorder.insert_events(events)?)
    }

    /// Domain events of one aggregate, decoded lazily
    pub fn get<E: DomainEvent>(
        &self,
        originator_id: Uuid,
        query: &EventQuery,
    ) -> Result<impl Iterator<Item = Result<Envelope<E>, StoreError>>, StoreError> {
        let stored = self.recorder.select_events(originator_id, query)?;
        let mapper = self.mapper;
        Ok(stored
            .into_iter()
            .map(move |s| mapper.decode(&s).map_err(StoreError::from)))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
