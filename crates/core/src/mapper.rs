// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversion between domain events and stored events

use crate::aggregate::{Aggregate, DomainEvent, Envelope};
use crate::event::StoredEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of snapshot topics, followed by the aggregate name
pub const SNAPSHOT_TOPIC_PREFIX: &str = "snapshot:";

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored topic {stored} does not match decoded topic {decoded}")]
    TopicMismatch { stored: String, decoded: String },
    #[error("cannot snapshot aggregate {0} with no events")]
    EmptyAggregate(uuid::Uuid),
}

#[derive(Serialize, Deserialize)]
struct Payload<T> {
    timestamp: DateTime<Utc>,
    body: T,
}

/// JSON mapper for events and snapshots
///
/// The stored state holds the event body with its timestamp; originator id,
/// version and topic travel in the stored event's own fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mapper;

impl Mapper {
    pub fn encode<E: DomainEvent>(&self, envelope: &Envelope<E>) -> Result<StoredEvent, MapperError> {
        let state = serde_json::to_vec(&Payload {
            timestamp: envelope.timestamp,
            body: &envelope.event,
        })?;
        Ok(StoredEvent::new(
            envelope.originator_id,
            envelope.originator_version,
            envelope.event.topic(),
            state,
        ))
    }

    pub fn decode<E: DomainEvent>(&self, stored: &StoredEvent) -> Result<Envelope<E>, MapperError> {
        let payload: Payload<E> = serde_json::from_slice(&stored.state)?;
        let decoded = payload.body.topic();
        if decoded != stored.topic {
            return Err(MapperError::TopicMismatch {
                stored: stored.topic.clone(),
                decoded: decoded.to_string(),
            });
        }
        Ok(Envelope {
            originator_id: stored.originator_id,
            originator_version: stored.originator_version,
            timestamp: payload.timestamp,
            event: payload.body,
        })
    }

    /// Encode an aggregate's current state as a snapshot
    ///
    /// The snapshot takes the version of the last event it covers.
    pub fn encode_snapshot<A: Aggregate>(&self, aggregate: &A) -> Result<StoredEvent, MapperError> {
        let version = aggregate
            .version()
            .checked_sub(1)
            .ok_or(MapperError::EmptyAggregate(aggregate.id()))?;
        let state = serde_json::to_vec(&Payload {
            timestamp: Utc::now(),
            body: aggregate,
        })?;
        Ok(StoredEvent::new(
            aggregate.id(),
            version,
            snapshot_topic::<A>(),
            state,
        ))
    }

    pub fn decode_snapshot<A: Aggregate>(&self, stored: &StoredEvent) -> Result<A, MapperError> {
        let expected = snapshot_topic::<A>();
        if stored.topic != expected {
            return Err(MapperError::TopicMismatch {
                stored: stored.topic.clone(),
                decoded: expected,
            });
        }
        let payload: Payload<A> = serde_json::from_slice(&stored.state)?;
        Ok(payload.body)
    }
}

pub fn snapshot_topic<A: Aggregate>() -> String {
    format!("{SNAPSHOT_TOPIC_PREFIX}{}", A::NAME)
}

#[cfg(test)]
#[path = "mapper_tests.rs"]
mod tests;
