// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs each edge of a system on its own tokio task

use super::Backoff;
use crate::error::RunnerError;
use crate::system::{Follower, Leader, System};
use herald_core::{PromptListener, RunnerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// One worker per edge
///
/// Each worker pulls a bounded batch, processes it on a blocking thread,
/// and when idle waits for a prompt from its leader or the poll interval.
/// Stopping lets every worker finish the batch in hand.
pub struct MultiThreadedRunner {
    system: System,
    config: RunnerConfig,
    stop_tx: Option<watch::Sender<bool>>,
    workers: Vec<JoinHandle<()>>,
}

/// Wakes the workers of one leader's edges
struct NotifyListener(Vec<Arc<Notify>>);

impl PromptListener for NotifyListener {
    fn prompt(&self, _leader: &str) {
        for notify in &self.0 {
            notify.notify_one();
        }
    }
}

impl MultiThreadedRunner {
    pub fn new(system: System, config: RunnerConfig) -> Self {
        Self {
            system,
            config,
            stop_tx: None,
            workers: Vec::new(),
        }
    }

    /// Spawn the workers; must be called inside a tokio runtime
    pub fn start(&mut self) -> Result<(), RunnerError> {
        if self.stop_tx.is_some() {
            return Err(RunnerError::AlreadyStarted);
        }

        let mut planned = Vec::new();
        let mut wakers: HashMap<String, Vec<Arc<Notify>>> = HashMap::new();
        for edge in self.system.edges() {
            let Some(leader) = self.system.node(&edge.leader) else {
                continue;
            };
            let log = leader
                .notification_log()
                .ok_or_else(|| RunnerError::RemoteLeader(edge.leader.clone()))?;
            let Some(follower) = self.system.follower(&edge.follower) else {
                continue;
            };
            follower.follow(&edge.leader, log)?;

            let notify = Arc::new(Notify::new());
            // Catch up on anything recorded before start
            notify.notify_one();
            wakers
                .entry(edge.leader.clone())
                .or_default()
                .push(Arc::clone(&notify));
            planned.push((edge.leader.clone(), follower, notify));
        }

        for (leader, notifies) in wakers {
            if let Some(node) = self.system.node(&leader) {
                node.subscribe(Arc::new(NotifyListener(notifies)));
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        for (leader, follower, notify) in planned {
            let worker = EdgeWorker {
                leader,
                follower,
                notify,
                stop: stop_rx.clone(),
                config: self.config.clone(),
            };
            self.workers.push(tokio::spawn(worker.run()));
        }
        self.stop_tx = Some(stop_tx);
        tracing::info!(workers = self.workers.len(), "multi-threaded runner started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Signal every worker and wait for them to finish
    pub async fn stop(&mut self) -> Result<(), RunnerError> {
        let Some(stop_tx) = self.stop_tx.take() else {
            return Ok(());
        };
        let _ = stop_tx.send(true);
        for worker in self.workers.drain(..) {
            worker.await?;
        }
        tracing::info!("multi-threaded runner stopped");
        Ok(())
    }
}

struct EdgeWorker {
    leader: String,
    follower: Arc<dyn Follower>,
    notify: Arc<Notify>,
    stop: watch::Receiver<bool>,
    config: RunnerConfig,
}

impl EdgeWorker {
    async fn run(mut self) {
        let batch_size = self.config.batch_size.max(1);
        let mut backoff = Backoff::new(self.config.backoff_initial, self.config.backoff_max);
        tracing::debug!(leader = %self.leader, follower = %self.follower.name(), "edge worker started");

        loop {
            if *self.stop.borrow() {
                break;
            }

            let follower = Arc::clone(&self.follower);
            let leader = self.leader.clone();
            let result =
                tokio::task::spawn_blocking(move || follower.pull_and_process(&leader, batch_size))
                    .await;

            let failed = match result {
                Ok(Ok(n)) => {
                    backoff.reset();
                    if n >= batch_size {
                        continue;
                    }
                    false
                }
                Ok(Err(e)) => {
                    tracing::warn!(leader = %self.leader, follower = %self.follower.name(), error = %e, "processing failed");
                    true
                }
                Err(e) => {
                    tracing::error!(leader = %self.leader, follower = %self.follower.name(), error = %e, "processing task failed");
                    true
                }
            };

            if failed {
                let delay = backoff.next_delay();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.stop.changed() => break,
                }
            } else {
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    _ = self.stop.changed() => break,
                }
            }
        }
        tracing::debug!(leader = %self.leader, follower = %self.follower.name(), "edge worker stopped");
    }
}

impl Drop for MultiThreadedRunner {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

#[cfg(test)]
#[path = "threaded_tests.rs"]
mod tests;
