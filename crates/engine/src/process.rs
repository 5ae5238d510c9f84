// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process applications: follow leaders and react to their events
//!
//! For each notification from a leader:
//!
//! ```text
//! decode → policy → insert_events_with_tracking(events, (leader, id))
//! ```
//!
//! The new events and the tracking row are written in one atomic unit, so
//! a notification is processed exactly once no matter how often it is
//! delivered.

use crate::error::{PolicyError, ProcessError};
use crate::system::{Follower, Leader};
use herald_core::{
    Aggregate, Application, ApplicationConfig, CommitOutcome, DomainEvent, Envelope, Mapper,
    Notification, NotificationLog, NotificationLogReader, ProcessRecorder, PromptListener,
    Repository, RepositoryError, RunnerConfig, StoredEvent, Tracking,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Reaction of a process application to its leaders' events
///
/// Event types are serde-tagged enums; a policy matches the variants it
/// cares about and ignores the rest.
pub trait Policy: Send + Sync + 'static {
    type Event: DomainEvent;

    /// Topics to pull from leaders (empty pulls every topic)
    fn topics(&self) -> Vec<String> {
        Vec::new()
    }

    fn policy<R: ProcessRecorder + ?Sized>(
        &self,
        event: &Envelope<Self::Event>,
        processing: &mut ProcessingEvent<'_, R>,
    ) -> Result<(), PolicyError>;
}

/// What a policy is working on: the tracked notification plus the events
/// collected so far
pub struct ProcessingEvent<'a, R: ?Sized> {
    tracking: Tracking,
    repository: Repository<'a, R>,
    mapper: Mapper,
    events: Vec<StoredEvent>,
}

impl<'a, R: ProcessRecorder + ?Sized> ProcessingEvent<'a, R> {
    fn new(tracking: Tracking, repository: Repository<'a, R>, mapper: Mapper) -> Self {
        Self {
            tracking,
            repository,
            mapper,
            events: Vec::new(),
        }
    }

    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    /// Downstream repository, for loading this application's aggregates
    pub fn repository(&self) -> &Repository<'a, R> {
        &self.repository
    }

    /// Load an aggregate, or `None` if it has no events yet
    pub fn get<A: Aggregate>(&self, id: Uuid) -> Result<Option<A>, PolicyError> {
        match self.repository.get(id, None) {
            Ok(aggregate) => Ok(Some(aggregate)),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Take an aggregate's pending events into this unit of work
    pub fn collect<A: Aggregate>(&mut self, aggregate: &mut A) -> Result<(), PolicyError> {
        let pending = aggregate.collect_events();
        self.collect_events(&pending)
    }

    pub fn collect_events<E: DomainEvent>(&mut self, events: &[Envelope<E>]) -> Result<(), PolicyError> {
        for envelope in events {
            self.events.push(self.mapper.encode(envelope)?);
        }
        Ok(())
    }

    /// Events collected so far
    pub fn events(&self) -> &[StoredEvent] {
        &self.events
    }
}

type EdgeReader = NotificationLogReader<Arc<dyn NotificationLog>>;

/// Result of handling one notification
enum Handled {
    Recorded,
    Skipped,
}

/// An application that follows leaders and processes their notifications
/// through a policy
pub struct ProcessApplication<R: ?Sized, P> {
    app: Application<R>,
    policy: P,
    max_commit_attempts: u32,
    readers: RwLock<HashMap<String, Arc<Mutex<EdgeReader>>>>,
}

impl<R, P> ProcessApplication<R, P>
where
    R: ProcessRecorder + ?Sized,
    P: Policy,
{
    pub fn new(config: &ApplicationConfig, recorder: Arc<R>, policy: P) -> Self {
        Self::from_application(Application::new(config, recorder), policy)
    }

    /// Wrap an existing application (e.g. one with snapshots enabled)
    pub fn from_application(app: Application<R>, policy: P) -> Self {
        Self {
            app,
            policy,
            max_commit_attempts: RunnerConfig::default().max_commit_attempts,
            readers: RwLock::new(HashMap::new()),
        }
    }

    /// Policy re-runs allowed after version conflicts
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    pub fn application(&self) -> &Application<R> {
        &self.app
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Names of the leaders this application follows
    pub fn leaders(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .readers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn reader(&self, leader: &str) -> Result<Arc<Mutex<EdgeReader>>, ProcessError> {
        self.readers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(leader)
            .cloned()
            .ok_or_else(|| ProcessError::UnknownLeader(leader.to_string()))
    }

    fn handle(&self, leader: &str, notification: &Notification) -> Result<Handled, ProcessError> {
        let recorder = self.app.recorder();
        if recorder.has_tracking_id(leader, notification.id)? {
            return Ok(Handled::Skipped);
        }

        let envelope: Envelope<P::Event> = self
            .app
            .events()
            .mapper()
            .decode(&notification.stored_event())
            .map_err(|source| ProcessError::Decode {
                leader: leader.to_string(),
                notification_id: notification.id,
                source,
            })?;
        let tracking = Tracking::new(leader, notification.id);

        for attempt in 1..=self.max_commit_attempts {
            let mut processing = ProcessingEvent::new(
                tracking.clone(),
                self.app.repository(),
                *self.app.events().mapper(),
            );
            self.policy
                .policy(&envelope, &mut processing)
                .map_err(|source| ProcessError::Policy {
                    leader: leader.to_string(),
                    notification_id: notification.id,
                    source,
                })?;

            match recorder.insert_events_with_tracking(&processing.events, &tracking) {
                Ok(CommitOutcome::Recorded(ids)) => {
                    tracing::debug!(
                        application = %self.app.name(),
                        leader,
                        notification_id = notification.id,
                        recorded = ids.len(),
                        "processed notification"
                    );
                    if !ids.is_empty() {
                        self.app.prompt_listeners();
                    }
                    return Ok(Handled::Recorded);
                }
                Ok(CommitOutcome::AlreadyProcessed) => return Ok(Handled::Skipped),
                Err(e) if e.is_concurrency() => {
                    tracing::debug!(
                        application = %self.app.name(),
                        leader,
                        notification_id = notification.id,
                        attempt,
                        "conflict while processing, retrying policy"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ProcessError::ConflictsExhausted {
            leader: leader.to_string(),
            notification_id: notification.id,
            attempts: self.max_commit_attempts,
        })
    }

    fn process_in_order(
        &self,
        leader: &str,
        notifications: &[Notification],
        mut on_done: impl FnMut(u64),
    ) -> Result<usize, ProcessError> {
        let mut previous = 0;
        let mut recorded = 0;
        for notification in notifications {
            if notification.id <= previous {
                return Err(ProcessError::OutOfOrder {
                    leader: leader.to_string(),
                    notification_id: notification.id,
                    position: previous,
                });
            }
            if let Handled::Recorded = self.handle(leader, notification)? {
                recorded += 1;
            }
            previous = notification.id;
            on_done(notification.id);
        }
        if recorded > 0 {
            tracing::info!(
                application = %self.app.name(),
                leader,
                recorded,
                skipped = notifications.len() - recorded,
                "processed batch"
            );
        }
        Ok(notifications.len())
    }
}

impl<R, P> Leader for ProcessApplication<R, P>
where
    R: ProcessRecorder + ?Sized + 'static,
    P: Policy,
{
    fn name(&self) -> &str {
        self.app.name()
    }

    fn notification_log(&self) -> Arc<dyn NotificationLog> {
        Arc::new(self.app.notification_log().clone())
    }

    fn subscribe(&self, listener: Arc<dyn PromptListener>) {
        self.app.subscribe(listener)
    }
}

impl<R, P> Follower for ProcessApplication<R, P>
where
    R: ProcessRecorder + ?Sized + 'static,
    P: Policy,
{
    fn follow(&self, leader: &str, log: Arc<dyn NotificationLog>) -> Result<(), ProcessError> {
        let position = self.app.recorder().max_tracking_id(leader)?;
        let mut reader = NotificationLogReader::new(log);
        reader.seek(position);
        self.readers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(leader.to_string(), Arc::new(Mutex::new(reader)));
        tracing::info!(application = %self.app.name(), leader, position, "following");
        Ok(())
    }

    fn pull_and_process(&self, leader: &str, limit: usize) -> Result<usize, ProcessError> {
        let reader = self.reader(leader)?;
        let mut reader = reader.lock().unwrap_or_else(|e| e.into_inner());
        let committed = reader.position();
        let batch = reader.select(limit, &self.policy.topics())?;

        let mut done = committed;
        let result = self.process_in_order(leader, &batch, |id| done = id);
        // Resume after the last notification that was fully handled
        reader.seek(done);
        result
    }

    fn process_notifications(
        &self,
        leader: &str,
        notifications: Vec<Notification>,
    ) -> Result<usize, ProcessError> {
        let processed = self.process_in_order(leader, &notifications, |_| {})?;
        if let (Ok(reader), Some(last)) = (self.reader(leader), notifications.last()) {
            let mut reader = reader.lock().unwrap_or_else(|e| e.into_inner());
            if reader.position() < last.id {
                reader.seek(last.id);
            }
        }
        Ok(processed)
    }

    fn position(&self, leader: &str) -> Result<u64, ProcessError> {
        Ok(self.app.recorder().max_tracking_id(leader)?)
    }

    fn topics(&self) -> Vec<String> {
        self.policy.topics()
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
