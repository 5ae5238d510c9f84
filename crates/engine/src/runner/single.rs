// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs a system in the caller's thread

use crate::error::{ProcessError, RunnerError};
use crate::system::{Follower, System};
use herald_core::{PromptListener, RunnerConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Processes prompts synchronously
///
/// A save on a leader prompts the runner, which drains its queue before the
/// save returns: followers pull and process, and their own saves enqueue
/// further prompts that are drained in the same loop.
pub struct SingleThreadedRunner {
    queue: Arc<PromptQueue>,
    started: bool,
}

struct PromptQueue {
    system: System,
    batch_size: usize,
    pending: Mutex<VecDeque<String>>,
    draining: AtomicBool,
    active: AtomicBool,
    errors: Mutex<Vec<ProcessError>>,
}

/// Forwards prompts to the queue while the runner is alive
struct QueueListener(Weak<PromptQueue>);

impl PromptListener for QueueListener {
    fn prompt(&self, leader: &str) {
        if let Some(queue) = self.0.upgrade() {
            queue.prompt(leader);
        }
    }
}

impl SingleThreadedRunner {
    pub fn new(system: System, config: &RunnerConfig) -> Self {
        Self {
            queue: Arc::new(PromptQueue {
                system,
                batch_size: config.batch_size.max(1),
                pending: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                active: AtomicBool::new(false),
                errors: Mutex::new(Vec::new()),
            }),
            started: false,
        }
    }

    /// Follow every edge, subscribe to leaders and catch up
    pub fn start(&mut self) -> Result<(), RunnerError> {
        if self.started {
            return Err(RunnerError::AlreadyStarted);
        }
        let system = &self.queue.system;
        for edge in system.edges() {
            let Some(leader) = system.node(&edge.leader) else {
                continue;
            };
            let log = leader
                .notification_log()
                .ok_or_else(|| RunnerError::RemoteLeader(edge.leader.clone()))?;
            if let Some(follower) = system.follower(&edge.follower) {
                follower.follow(&edge.leader, log)?;
            }
        }

        let listener: Arc<dyn PromptListener> = Arc::new(QueueListener(Arc::downgrade(&self.queue)));
        for name in system.leaders() {
            if let Some(node) = system.node(name) {
                node.subscribe(Arc::clone(&listener));
            }
        }
        self.started = true;
        self.queue.active.store(true, Ordering::SeqCst);
        tracing::info!(edges = system.edges().len(), "single-threaded runner started");

        // Catch up on anything recorded before the runner started
        for name in system.leaders() {
            self.queue.prompt(name);
        }
        match self.take_errors().into_iter().next() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Ignore further prompts
    pub fn stop(&mut self) {
        self.queue.active.store(false, Ordering::SeqCst);
        tracing::info!("single-threaded runner stopped");
    }

    pub fn system(&self) -> &System {
        &self.queue.system
    }

    /// Errors raised while draining prompts since the last call
    pub fn take_errors(&self) -> Vec<ProcessError> {
        std::mem::take(&mut *self.queue.errors.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl PromptQueue {
    fn prompt(&self, leader: &str) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(leader.to_string());

        loop {
            // A prompt raised while draining joins the queue being drained
            if self.draining.swap(true, Ordering::SeqCst) {
                return;
            }
            while let Some(next) = self.pop() {
                self.run(&next);
            }
            self.draining.store(false, Ordering::SeqCst);
            if self.is_empty() {
                return;
            }
        }
    }

    fn pop(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    fn is_empty(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    fn run(&self, leader: &str) {
        for name in self.system.followers_of(leader) {
            let Some(follower) = self.system.follower(name) else {
                continue;
            };
            loop {
                match follower.pull_and_process(leader, self.batch_size) {
                    Ok(n) if n >= self.batch_size => continue,
                    Ok(_) => break,
                    Err(e) => {
                        tracing::error!(leader, follower = name, error = %e, "processing failed");
                        self.errors
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push(e);
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for SingleThreadedRunner {
    fn drop(&mut self) {
        self.queue.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "single_tests.rs"]
mod tests;
