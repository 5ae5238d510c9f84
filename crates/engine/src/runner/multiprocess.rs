// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs followers against leaders in other processes

use super::Backoff;
use crate::error::RunnerError;
use crate::remote::{LocalUpstream, RemoteNotificationLog, UpstreamLog};
use crate::system::{Follower, Leader, Node, System};
use herald_core::RunnerConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One worker per edge, pulling over sockets
///
/// Remote leaders cannot prompt, so workers poll. The position for each
/// pull is the follower's tracking position, so after any failure the next
/// pull starts from the first unprocessed notification.
pub struct MultiProcessRunner {
    system: System,
    config: RunnerConfig,
    endpoints: HashMap<String, PathBuf>,
    stop_tx: Option<watch::Sender<bool>>,
    workers: Vec<JoinHandle<()>>,
}

impl MultiProcessRunner {
    pub fn new(system: System, config: RunnerConfig) -> Self {
        Self {
            system,
            config,
            endpoints: HashMap::new(),
            stop_tx: None,
            workers: Vec::new(),
        }
    }

    /// Socket on which a remote leader serves its log
    pub fn with_endpoint(mut self, leader: &str, socket_path: impl Into<PathBuf>) -> Self {
        self.endpoints.insert(leader.to_string(), socket_path.into());
        self
    }

    fn upstream(&self, leader: &str) -> Result<Arc<dyn UpstreamLog>, RunnerError> {
        match self.system.node(leader) {
            Some(Node::Remote) => {
                let path = self
                    .endpoints
                    .get(leader)
                    .ok_or_else(|| RunnerError::NoEndpoint(leader.to_string()))?;
                Ok(Arc::new(
                    RemoteNotificationLog::new(path.clone()).with_timeout(self.config.pull_timeout),
                ))
            }
            Some(node) => match node.notification_log() {
                Some(log) => Ok(Arc::new(LocalUpstream(log))),
                None => Err(RunnerError::NoEndpoint(leader.to_string())),
            },
            None => Err(RunnerError::NoEndpoint(leader.to_string())),
        }
    }

    pub fn start(&mut self) -> Result<(), RunnerError> {
        if self.stop_tx.is_some() {
            return Err(RunnerError::AlreadyStarted);
        }

        let mut planned = Vec::new();
        for edge in self.system.edges() {
            let Some(follower) = self.system.follower(&edge.follower) else {
                continue;
            };
            planned.push((edge.leader.clone(), follower, self.upstream(&edge.leader)?));
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        for (leader, follower, upstream) in planned {
            let worker = RemoteWorker {
                leader,
                follower,
                upstream,
                stop: stop_rx.clone(),
                config: self.config.clone(),
            };
            self.workers.push(tokio::spawn(worker.run()));
        }
        self.stop_tx = Some(stop_tx);
        tracing::info!(workers = self.workers.len(), "multi-process runner started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub async fn stop(&mut self) -> Result<(), RunnerError> {
        let Some(stop_tx) = self.stop_tx.take() else {
            return Ok(());
        };
        let _ = stop_tx.send(true);
        for worker in self.workers.drain(..) {
            worker.await?;
        }
        tracing::info!("multi-process runner stopped");
        Ok(())
    }
}

impl Drop for MultiProcessRunner {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

struct RemoteWorker {
    leader: String,
    follower: Arc<dyn Follower>,
    upstream: Arc<dyn UpstreamLog>,
    stop: watch::Receiver<bool>,
    config: RunnerConfig,
}

enum Step {
    /// A full batch was processed; pull again straight away
    More,
    Idle,
    Failed,
}

impl RemoteWorker {
    async fn run(mut self) {
        let mut backoff = Backoff::new(self.config.backoff_initial, self.config.backoff_max);
        let mut position = None;
        tracing::debug!(leader = %self.leader, follower = %self.follower.name(), "remote worker started");

        loop {
            if *self.stop.borrow() {
                break;
            }

            let wait = match self.step(&mut position).await {
                Step::More => {
                    backoff.reset();
                    continue;
                }
                Step::Idle => {
                    backoff.reset();
                    self.config.poll_interval
                }
                Step::Failed => {
                    // Re-read the tracking position before the next pull
                    position = None;
                    backoff.next_delay()
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.stop.changed() => break,
            }
        }
        tracing::debug!(leader = %self.leader, follower = %self.follower.name(), "remote worker stopped");
    }

    async fn step(&self, position: &mut Option<u64>) -> Step {
        let batch_size = self.config.batch_size.max(1);
        let start = match *position {
            Some(p) => p,
            None => {
                let follower = Arc::clone(&self.follower);
                let leader = self.leader.clone();
                match tokio::task::spawn_blocking(move || follower.position(&leader)).await {
                    Ok(Ok(p)) => p,
                    Ok(Err(e)) => {
                        tracing::warn!(leader = %self.leader, error = %e, "cannot read tracking position");
                        return Step::Failed;
                    }
                    Err(e) => {
                        tracing::error!(leader = %self.leader, error = %e, "position task failed");
                        return Step::Failed;
                    }
                }
            }
        };

        let topics = self.follower.topics();
        let pulled = tokio::time::timeout(
            self.config.pull_timeout,
            self.upstream.select(start + 1, batch_size, &topics),
        )
        .await;
        let batch = match pulled {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                tracing::warn!(leader = %self.leader, error = %e, "pull failed");
                return Step::Failed;
            }
            Err(_) => {
                tracing::warn!(leader = %self.leader, timeout = ?self.config.pull_timeout, "pull timed out");
                return Step::Failed;
            }
        };
        if batch.is_empty() {
            *position = Some(start);
            return Step::Idle;
        }

        let last = batch.last().map_or(start, |n| n.id);
        let pulled = batch.len();
        let follower = Arc::clone(&self.follower);
        let leader = self.leader.clone();
        match tokio::task::spawn_blocking(move || follower.process_notifications(&leader, batch)).await {
            Ok(Ok(_)) => {
                *position = Some(last);
                if pulled >= batch_size {
                    Step::More
                } else {
                    Step::Idle
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(leader = %self.leader, follower = %self.follower.name(), error = %e, "processing failed");
                Step::Failed
            }
            Err(e) => {
                tracing::error!(leader = %self.leader, error = %e, "processing task failed");
                Step::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "multiprocess_tests.rs"]
mod tests;
