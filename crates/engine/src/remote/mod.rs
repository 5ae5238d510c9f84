// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification logs across process boundaries
//!
//! A leader process serves its notification log on a Unix socket; followers
//! in other processes pull from it with [`RemoteNotificationLog`], or page
//! through it with a [`NotificationLogReader`](herald_core::NotificationLogReader)
//! over a [`BlockingRemoteLog`].

mod client;
pub mod protocol;

pub use client::{BlockingRemoteLog, RemoteError, RemoteNotificationLog};
pub use protocol::{ProtocolError, Request, Response};

use async_trait::async_trait;
use herald_core::{Notification, NotificationLog};
use std::sync::Arc;

/// A leader's log as seen by a follower's worker loop
#[async_trait]
pub trait UpstreamLog: Send + Sync {
    async fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RemoteError>;
}

#[async_trait]
impl UpstreamLog for RemoteNotificationLog {
    async fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RemoteError> {
        RemoteNotificationLog::select(self, start, limit, topics).await
    }
}

/// Upstream log living in this process
pub struct LocalUpstream(pub Arc<dyn NotificationLog>);

#[async_trait]
impl UpstreamLog for LocalUpstream {
    async fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, RemoteError> {
        let log = Arc::clone(&self.0);
        let topics = topics.to_vec();
        let items = tokio::task::spawn_blocking(move || log.select(start, limit, &topics)).await??;
        Ok(items)
    }
}
