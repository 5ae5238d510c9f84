// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregates and domain events
//!
//! An aggregate's state is the fold of its events. New events are triggered
//! against the live aggregate, applied immediately, and held as pending
//! until an application saves them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A domain event type
///
/// Usually a serde-tagged enum with one variant per kind of state change.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Topic naming the event's logical type
    fn topic(&self) -> &'static str;
}

/// A domain event positioned in its aggregate's sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<E> {
    pub originator_id: Uuid,
    pub originator_version: u64,
    pub timestamp: DateTime<Utc>,
    pub event: E,
}

impl<E> Envelope<E> {
    pub fn new(originator_id: Uuid, originator_version: u64, event: E) -> Self {
        Self {
            originator_id,
            originator_version,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Errors raised while applying events to an aggregate
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("aggregate {0} has no creation event")]
    NotCreated(Uuid),
    #[error("event version {actual} does not follow version {expected} of {id}")]
    VersionMismatch { id: Uuid, expected: u64, actual: u64 },
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Identity, version and pending events of an aggregate
///
/// Aggregates embed one of these and expose it through [`Aggregate::root`].
/// Pending events are never serialized, so snapshots only carry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root<E> {
    id: Uuid,
    version: u64,
    #[serde(skip, default = "Vec::new")]
    pending: Vec<Envelope<E>>,
}

impl<E> Root<E> {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            pending: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of events applied so far
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pending(&self) -> &[Envelope<E>] {
        &self.pending
    }
}

/// An event-sourced aggregate
pub trait Aggregate: Serialize + DeserializeOwned + Sized + Send + Sync + 'static {
    type Event: DomainEvent;

    /// Name used in snapshot topics
    const NAME: &'static str;

    fn root(&self) -> &Root<Self::Event>;

    fn root_mut(&mut self) -> &mut Root<Self::Event>;

    /// Build the aggregate from its first event
    fn create(id: Uuid, event: &Self::Event) -> Result<Self, AggregateError>;

    /// Apply a subsequent event
    fn apply(&mut self, event: &Self::Event) -> Result<(), AggregateError>;

    fn id(&self) -> Uuid {
        self.root().id
    }

    /// Number of events applied (the version the next event will take)
    fn version(&self) -> u64 {
        self.root().version
    }

    /// Fold one event into an optional aggregate
    fn mutate(state: Option<Self>, envelope: &Envelope<Self::Event>) -> Result<Self, AggregateError> {
        let mut aggregate = match state {
            None => {
                if envelope.originator_version != 0 {
                    return Err(AggregateError::NotCreated(envelope.originator_id));
                }
                Self::create(envelope.originator_id, &envelope.event)?
            }
            Some(mut aggregate) => {
                if envelope.originator_version != aggregate.version() {
                    return Err(AggregateError::VersionMismatch {
                        id: aggregate.id(),
                        expected: aggregate.version(),
                        actual: envelope.originator_version,
                    });
                }
                aggregate.apply(&envelope.event)?;
                aggregate
            }
        };
        aggregate.root_mut().version = envelope.originator_version + 1;
        Ok(aggregate)
    }

    /// Create a new aggregate from its first event, leaving the event pending
    fn start(id: Uuid, event: Self::Event) -> Result<Self, AggregateError> {
        let envelope = Envelope::new(id, 0, event);
        let mut aggregate = Self::mutate(None, &envelope)?;
        aggregate.root_mut().pending.push(envelope);
        Ok(aggregate)
    }

    /// Apply a new event and keep it pending
    fn trigger(&mut self, event: Self::Event) -> Result<(), AggregateError> {
        let envelope = Envelope::new(self.id(), self.version(), event);
        self.apply(&envelope.event)?;
        let root = self.root_mut();
        root.version += 1;
        root.pending.push(envelope);
        Ok(())
    }

    /// Take the pending events, leaving none behind
    fn collect_events(&mut self) -> Vec<Envelope<Self::Event>> {
        std::mem::take(&mut self.root_mut().pending)
    }

    /// Put events back in front of any pending ones (after a failed save)
    fn restore_pending(&mut self, mut events: Vec<Envelope<Self::Event>>) {
        let root = self.root_mut();
        events.append(&mut root.pending);
        root.pending = events;
    }
}

/// Rebuild an aggregate by folding events from scratch
///
/// Returns `Ok(None)` when there are no events.
pub fn reconstruct<'a, A, I>(events: I) -> Result<Option<A>, AggregateError>
where
    A: Aggregate,
    I: IntoIterator<Item = &'a Envelope<A::Event>>,
{
    events
        .into_iter()
        .try_fold(None, |state, envelope| A::mutate(state, envelope).map(Some))
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
