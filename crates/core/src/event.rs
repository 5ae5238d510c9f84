// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record types
//!
//! Every durable fact in a store is one of three records:
//! - `StoredEvent` - one event in an aggregate's sequence
//! - `Notification` - a stored event plus its position in the application's total order
//! - `Tracking` - the upstream position a process application has consumed

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The canonical persisted form of one domain event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Aggregate that owns the event
    pub originator_id: Uuid,
    /// Zero-based position in the aggregate's sequence
    pub originator_version: u64,
    /// Logical event type, used to pick a decoder
    pub topic: String,
    /// Serialized payload (opaque to the store)
    pub state: Vec<u8>,
}

impl StoredEvent {
    pub fn new(
        originator_id: Uuid,
        originator_version: u64,
        topic: impl Into<String>,
        state: Vec<u8>,
    ) -> Self {
        Self {
            originator_id,
            originator_version,
            topic: topic.into(),
            state,
        }
    }

    /// Attach a notification id to this event
    pub fn into_notification(self, id: u64) -> Notification {
        Notification {
            id,
            originator_id: self.originator_id,
            originator_version: self.originator_version,
            topic: self.topic,
            state: self.state,
        }
    }
}

/// A stored event positioned in an application's total order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Position in the application's log (starts at 1)
    pub id: u64,
    pub originator_id: Uuid,
    pub originator_version: u64,
    pub topic: String,
    pub state: Vec<u8>,
}

impl Notification {
    /// The stored event carried by this notification
    pub fn stored_event(&self) -> StoredEvent {
        StoredEvent {
            originator_id: self.originator_id,
            originator_version: self.originator_version,
            topic: self.topic.clone(),
            state: self.state.clone(),
        }
    }

    /// Whether this notification passes a topic filter (empty filter passes all)
    pub fn matches_topics(&self, topics: &[String]) -> bool {
        topics.is_empty() || topics.iter().any(|t| t == &self.topic)
    }
}

/// Marker recording that an upstream notification has been processed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tracking {
    /// Name of the upstream application whose log was consumed
    pub application_name: String,
    /// Id of the consumed upstream notification
    pub notification_id: u64,
}

impl Tracking {
    pub fn new(application_name: impl Into<String>, notification_id: u64) -> Self {
        Self {
            application_name: application_name.into(),
            notification_id,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
