// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of a served notification log

use super::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};
use herald_core::{LogError, Notification, NotificationLog, Section};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;
use tokio::runtime::Handle;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("server error: {0}")]
    Server(String),
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(Box<Response>),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A leader's notification log served on a Unix socket
///
/// Each request uses its own connection; every connect, write and read is
/// bounded by the timeout.
#[derive(Debug, Clone)]
pub struct RemoteNotificationLog {
    socket_path: PathBuf,
    timeout: Duration,
}

impl RemoteNotificationLog {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn ping(&self) -> Result<(), RemoteError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn section(&self, section_id: &str) -> Result<Section, RemoteError> {
        let request = Request::Section {
            section_id: section_id.to_string(),
        };
        match self.send(request).await? {
            Response::Section { section } => Ok(section),
            other => Err(unexpected(other)),
        }
    }

    pub async fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RemoteError> {
        let request = Request::Select {
            start,
            limit,
            topics: topics.to_vec(),
        };
        match self.send(request).await? {
            Response::Notifications { items } => Ok(items),
            other => Err(unexpected(other)),
        }
    }

    async fn send(&self, request: Request) -> Result<Response, RemoteError> {
        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| ProtocolError::Timeout)?
            .map_err(|source| RemoteError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(self.timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let bytes = tokio::time::timeout(self.timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        match protocol::decode(&bytes)? {
            Response::Error { message } => Err(RemoteError::Server(message)),
            response => Ok(response),
        }
    }
}

/// A [`RemoteNotificationLog`] usable wherever a [`NotificationLog`] is
///
/// Each call blocks on `handle` until the request completes, so calls must
/// come from outside the runtime's async tasks (a plain thread or
/// `spawn_blocking`).
#[derive(Debug, Clone)]
pub struct BlockingRemoteLog {
    remote: RemoteNotificationLog,
    handle: Handle,
}

impl BlockingRemoteLog {
    pub fn new(remote: RemoteNotificationLog, handle: Handle) -> Self {
        Self { remote, handle }
    }

    pub fn remote(&self) -> &RemoteNotificationLog {
        &self.remote
    }
}

impl NotificationLog for BlockingRemoteLog {
    fn section(&self, section_id: &str) -> Result<Section, LogError> {
        self.handle
            .block_on(self.remote.section(section_id))
            .map_err(LogError::from)
    }

    fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, LogError> {
        self.handle
            .block_on(self.remote.select(start, limit, topics))
            .map_err(LogError::from)
    }
}

impl From<RemoteError> for LogError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Log(e) => e,
            other => LogError::Unavailable(other.to_string()),
        }
    }
}

fn unexpected(response: Response) -> RemoteError {
    RemoteError::UnexpectedResponse(Box::new(response))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
