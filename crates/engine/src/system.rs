// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System definition: named applications joined by pipes
//!
//! ```text
//! pipe(["dogs", "counters", "reports"])
//!
//!   dogs ──▶ counters ──▶ reports
//!  leader    follower     follower
//!            + leader
//! ```
//!
//! Every follower must be a process application. A remote application
//! lives in another process and can only lead.

use crate::error::ProcessError;
use herald_core::{
    Application, ApplicationRecorder, Notification, NotificationLog, PromptListener,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemError {
    #[error("application {0} is already part of the system")]
    DuplicateName(String),
    #[error("unknown application: {0}")]
    UnknownApplication(String),
    #[error("application {0} cannot follow itself")]
    SelfEdge(String),
    #[error("{0} is not a process application and cannot follow")]
    NotAProcess(String),
    #[error("a pipe needs at least two applications")]
    PipeTooShort,
}

/// An application whose notification log others can follow
pub trait Leader: Send + Sync {
    fn name(&self) -> &str;

    fn notification_log(&self) -> Arc<dyn NotificationLog>;

    /// Register for prompts after new events are recorded
    fn subscribe(&self, listener: Arc<dyn PromptListener>);
}

/// A process application, as driven by runners
pub trait Follower: Leader {
    /// Start following a leader from the last tracked position
    fn follow(&self, leader: &str, log: Arc<dyn NotificationLog>) -> Result<(), ProcessError>;

    /// Pull up to `limit` notifications from a followed leader and process them
    ///
    /// Returns the number of notifications consumed.
    fn pull_and_process(&self, leader: &str, limit: usize) -> Result<usize, ProcessError>;

    /// Process notifications obtained elsewhere, in id order
    fn process_notifications(
        &self,
        leader: &str,
        notifications: Vec<Notification>,
    ) -> Result<usize, ProcessError>;

    /// Highest notification id from `leader` that has been processed
    fn position(&self, leader: &str) -> Result<u64, ProcessError>;

    /// Topics this follower consumes (empty consumes every topic)
    fn topics(&self) -> Vec<String>;
}

impl<R: ApplicationRecorder + ?Sized + 'static> Leader for Application<R> {
    fn name(&self) -> &str {
        Application::name(self)
    }

    fn notification_log(&self) -> Arc<dyn NotificationLog> {
        Arc::new(Application::notification_log(self).clone())
    }

    fn subscribe(&self, listener: Arc<dyn PromptListener>) {
        Application::subscribe(self, listener)
    }
}

/// A member of the system
#[derive(Clone)]
pub enum Node {
    Application(Arc<dyn Leader>),
    Process(Arc<dyn Follower>),
    /// Known by name only; its log is reached over a socket
    Remote,
}

impl Node {
    /// The local notification log, if this node has one
    pub fn notification_log(&self) -> Option<Arc<dyn NotificationLog>> {
        match self {
            Node::Application(app) => Some(app.notification_log()),
            Node::Process(app) => Some(app.notification_log()),
            Node::Remote => None,
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn PromptListener>) {
        match self {
            Node::Application(app) => app.subscribe(listener),
            Node::Process(app) => app.subscribe(listener),
            Node::Remote => {}
        }
    }
}

/// A directed edge: `follower` consumes `leader`'s notification log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub leader: String,
    pub follower: String,
}

/// Applications by name plus the edges between them
#[derive(Clone, Default)]
pub struct System {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_application<L: Leader + 'static>(&mut self, app: Arc<L>) -> Result<&mut Self, SystemError> {
        let name = app.name().to_string();
        self.insert(name, Node::Application(app))
    }

    pub fn add_process<F: Follower + 'static>(&mut self, app: Arc<F>) -> Result<&mut Self, SystemError> {
        let name = app.name().to_string();
        self.insert(name, Node::Process(app))
    }

    /// Declare an application that runs in another process
    pub fn add_remote(&mut self, name: &str) -> Result<&mut Self, SystemError> {
        self.insert(name.to_string(), Node::Remote)
    }

    fn insert(&mut self, name: String, node: Node) -> Result<&mut Self, SystemError> {
        if self.nodes.contains_key(&name) {
            return Err(SystemError::DuplicateName(name));
        }
        self.nodes.insert(name, node);
        Ok(self)
    }

    /// Connect applications in a chain: each one follows the one before it
    pub fn pipe<I, S>(&mut self, names: I) -> Result<&mut Self, SystemError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
        if names.len() < 2 {
            return Err(SystemError::PipeTooShort);
        }
        for name in &names {
            if !self.nodes.contains_key(name) {
                return Err(SystemError::UnknownApplication(name.clone()));
            }
        }

        let mut edges = Vec::new();
        for pair in names.windows(2) {
            let (leader, follower) = (&pair[0], &pair[1]);
            if leader == follower {
                return Err(SystemError::SelfEdge(leader.clone()));
            }
            if !matches!(self.nodes.get(follower), Some(Node::Process(_))) {
                return Err(SystemError::NotAProcess(follower.clone()));
            }
            edges.push(Edge {
                leader: leader.clone(),
                follower: follower.clone(),
            });
        }

        for edge in edges {
            if !self.edges.contains(&edge) {
                self.edges.push(edge);
            }
        }
        Ok(self)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn follower(&self, name: &str) -> Option<Arc<dyn Follower>> {
        match self.nodes.get(name) {
            Some(Node::Process(app)) => Some(Arc::clone(app)),
            _ => None,
        }
    }

    /// Names of the applications that `follower` follows
    pub fn leaders_of<'a>(&'a self, follower: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.follower == follower)
            .map(|e| e.leader.as_str())
    }

    /// Names of the applications following `leader`
    pub fn followers_of<'a>(&'a self, leader: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.leader == leader)
            .map(|e| e.follower.as_str())
    }

    /// Names of applications that lead at least one edge, without repeats
    pub fn leaders(&self) -> Vec<&str> {
        let mut leaders: Vec<&str> = Vec::new();
        for edge in &self.edges {
            if !leaders.contains(&edge.leader.as_str()) {
                leaders.push(&edge.leader);
            }
        }
        leaders
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
