// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herald-core: event-sourcing persistence
//!
//! This crate provides:
//! - Stored event, notification and tracking records
//! - Recorder contracts with in-memory and traced implementations
//! - Aggregates, the JSON mapper, event store and repository
//! - Applications with linked-section notification logs
//! - The BigArray position tree and a positioned log reader

pub mod aggregate;
pub mod application;
pub mod config;
pub mod event;
pub mod mapper;
pub mod notification;
pub mod recorder;
pub mod repository;
pub mod sequence;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use aggregate::{reconstruct, Aggregate, AggregateError, DomainEvent, Envelope, Root};
pub use application::{Application, ApplicationError, PromptListener};
pub use config::{ApplicationConfig, BigArrayConfig, Config, ConfigError, RunnerConfig};
pub use event::{Notification, StoredEvent, Tracking};
pub use mapper::{Mapper, MapperError};
pub use notification::{
    BigArray, BigArrayError, BigArrayNotificationLog, LocalNotificationLog, LogError,
    NotificationLog, NotificationLogReader, Section, SectionId, CURRENT_SECTION,
};
pub use recorder::{
    AggregateRecorder, ApplicationRecorder, CommitOutcome, EventQuery, MemoryRecorder,
    ProcessRecorder, RecordError, RecordIndex, TracedRecorder,
};
pub use repository::{Repository, RepositoryError};
pub use sequence::{AtomicSequence, IntegerSequence};
pub use store::{EventStore, StoreError};
