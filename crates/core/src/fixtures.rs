// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small aggregates used by tests across the workspace

use crate::aggregate::{Aggregate, AggregateError, DomainEvent, Root};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DogEvent {
    Registered { name: String },
    TrickAdded { trick: String },
}

impl DomainEvent for DogEvent {
    fn topic(&self) -> &'static str {
        match self {
            DogEvent::Registered { .. } => "dog:registered",
            DogEvent::TrickAdded { .. } => "dog:trick_added",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    root: Root<DogEvent>,
    pub name: String,
    pub tricks: Vec<String>,
}

impl Dog {
    pub fn register(name: &str) -> Result<Self, AggregateError> {
        Self::start(
            Uuid::new_v4(),
            DogEvent::Registered {
                name: name.to_string(),
            },
        )
    }

    pub fn add_trick(&mut self, trick: &str) -> Result<(), AggregateError> {
        self.trigger(DogEvent::TrickAdded {
            trick: trick.to_string(),
        })
    }
}

impl Aggregate for Dog {
    type Event = DogEvent;
    const NAME: &'static str = "dog";

    fn root(&self) -> &Root<DogEvent> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Root<DogEvent> {
        &mut self.root
    }

    fn create(id: Uuid, event: &DogEvent) -> Result<Self, AggregateError> {
        match event {
            DogEvent::Registered { name } => Ok(Self {
                root: Root::new(id),
                name: name.clone(),
                tricks: Vec::new(),
            }),
            _ => Err(AggregateError::NotCreated(id)),
        }
    }

    fn apply(&mut self, event: &DogEvent) -> Result<(), AggregateError> {
        match event {
            DogEvent::TrickAdded { trick } => {
                self.tricks.push(trick.clone());
                Ok(())
            }
            DogEvent::Registered { .. } => {
                Err(AggregateError::Rejected("dog is already registered".to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CounterEvent {
    Started { name: String },
    Incremented,
}

impl DomainEvent for CounterEvent {
    fn topic(&self) -> &'static str {
        match self {
            CounterEvent::Started { .. } => "counter:started",
            CounterEvent::Incremented => "counter:incremented",
        }
    }
}

/// Counts occurrences of a name
///
/// Counters are keyed by a name-derived id so that independent processes
/// agree on which aggregate to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    root: Root<CounterEvent>,
    pub name: String,
    pub count: u64,
}

impl Counter {
    pub fn id_for(name: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("counter:{name}").as_bytes())
    }

    pub fn start_for(name: &str) -> Result<Self, AggregateError> {
        Self::start(
            Self::id_for(name),
            CounterEvent::Started {
                name: name.to_string(),
            },
        )
    }

    pub fn increment(&mut self) -> Result<(), AggregateError> {
        self.trigger(CounterEvent::Incremented)
    }
}

impl Aggregate for Counter {
    type Event = CounterEvent;
    const NAME: &'static str = "counter";

    fn root(&self) -> &Root<CounterEvent> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Root<CounterEvent> {
        &mut self.root
    }

    fn create(id: Uuid, event: &CounterEvent) -> Result<Self, AggregateError> {
        match event {
            CounterEvent::Started { name } => Ok(Self {
                root: Root::new(id),
                name: name.clone(),
                count: 0,
            }),
            CounterEvent::Incremented => Err(AggregateError::NotCreated(id)),
        }
    }

    fn apply(&mut self, event: &CounterEvent) -> Result<(), AggregateError> {
        match event {
            CounterEvent::Incremented => {
                self.count += 1;
                Ok(())
            }
            CounterEvent::Started { .. } => {
                Err(AggregateError::Rejected("counter already started".to_string()))
            }
        }
    }
}
