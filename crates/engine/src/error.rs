// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for process applications and runners

use crate::remote::RemoteError;
use crate::system::SystemError;
use herald_core::{
    AggregateError, LogError, MapperError, RecordError, RepositoryError, StoreError,
};
use thiserror::Error;

/// Errors raised by a policy while handling one event
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
    #[error("policy rejected event: {0}")]
    Rejected(String),
}

impl From<StoreError> for PolicyError {
    fn from(err: StoreError) -> Self {
        PolicyError::Repository(RepositoryError::Store(err))
    }
}

/// Errors that can occur while a process application consumes a leader
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("not following {0}")]
    UnknownLeader(String),
    #[error("notification log error: {0}")]
    Log(#[from] LogError),
    #[error("cannot decode notification {notification_id} from {leader}: {source}")]
    Decode {
        leader: String,
        notification_id: u64,
        source: MapperError,
    },
    #[error("policy failed on notification {notification_id} from {leader}: {source}")]
    Policy {
        leader: String,
        notification_id: u64,
        source: PolicyError,
    },
    #[error("notification {notification_id} from {leader} still conflicts after {attempts} attempts")]
    ConflictsExhausted {
        leader: String,
        notification_id: u64,
        attempts: u32,
    },
    #[error("notifications from {leader} out of order: {notification_id} after {position}")]
    OutOfOrder {
        leader: String,
        notification_id: u64,
        position: u64,
    },
    #[error("record error: {0}")]
    Record(#[from] RecordError),
}

/// Errors that can occur while starting or stopping a runner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0} is a remote application and needs the multi-process runner")]
    RemoteLeader(String),
    #[error("no endpoint configured for remote application {0}")]
    NoEndpoint(String),
    #[error("runner is already started")]
    AlreadyStarted,
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
