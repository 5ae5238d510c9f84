// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unbounded append-only array built from bounded aggregate sequences
//!
//! ```text
//! root            height markers (version = height - 1)
//!   level 2       apex arrays: slot s of array n refers to array n*size+s below
//!   level 1       apex arrays
//!   level 0       base arrays: slot s of array b holds item b*size+s
//! ```
//!
//! Every array is an aggregate sequence with a UUID v5 id derived from the
//! big array id, so each slot is written at most once by the recorder's
//! version uniqueness. Item `i` lives in base array `i / size` at version
//! `i % size`; reads never traverse the tree. Apex references exist only to
//! find the frontier quickly.

use super::{present, resolve_window, LogError, NotificationLog, Section};
use crate::config::{ApplicationConfig, BigArrayConfig};
use crate::event::{Notification, StoredEvent};
use crate::recorder::{AggregateRecorder, EventQuery, RecordError};
use crate::sequence::IntegerSequence;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const ITEM_TOPIC: &str = "herald.bigarray.item";
const REF_TOPIC: &str = "herald.bigarray.ref";
const ROOT_TOPIC: &str = "herald.bigarray.root";

pub const DEFAULT_ARRAY_SIZE: u64 = 10_000;
pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 100;
pub const DEFAULT_HOLE_HORIZON: u64 = 1_000;

#[derive(Debug, Error)]
pub enum BigArrayError {
    #[error("position {index} is already assigned")]
    Concurrency { index: u64 },
    #[error("gave up appending after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("recorder error: {0}")]
    Record(RecordError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RecordError> for BigArrayError {
    fn from(err: RecordError) -> Self {
        BigArrayError::Record(err)
    }
}

/// Append-only array of `T` stored in fixed-size aggregate sequences
pub struct BigArray<T, R: ?Sized> {
    id: Uuid,
    array_size: u64,
    max_append_attempts: u32,
    recorder: Arc<R>,
    _item: PhantomData<fn() -> T>,
}

impl<T, R: ?Sized> Clone for BigArray<T, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            array_size: self.array_size,
            max_append_attempts: self.max_append_attempts,
            recorder: Arc::clone(&self.recorder),
            _item: PhantomData,
        }
    }
}

impl<T, R> BigArray<T, R>
where
    T: Serialize + DeserializeOwned,
    R: AggregateRecorder + ?Sized,
{
    pub fn new(id: Uuid, array_size: u64, recorder: Arc<R>) -> Self {
        Self {
            id,
            array_size: array_size.max(2),
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
            recorder,
            _item: PhantomData,
        }
    }

    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts.max(1);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn array_size(&self) -> u64 {
        self.array_size
    }

    /// Id of the array at `level` with the given number
    pub fn array_id(&self, level: u32, number: u64) -> Uuid {
        Uuid::new_v5(&self.id, format!("{level}:{number}").as_bytes())
    }

    fn root_id(&self) -> Uuid {
        Uuid::new_v5(&self.id, b"root")
    }

    /// Number of tree levels needed to address `index`
    fn height_for(&self, index: u64) -> u32 {
        let mut height = 1;
        let mut capacity = self.array_size;
        while index >= capacity {
            height += 1;
            match capacity.checked_mul(self.array_size) {
                Some(next) => capacity = next,
                None => break,
            }
        }
        height
    }

    /// Current tree height (0 before anything was registered)
    pub fn height(&self) -> Result<u32, BigArrayError> {
        Ok(self
            .recorder
            .max_version(self.root_id())?
            .map_or(0, |v| v as u32 + 1))
    }

    /// Index the next append would take
    ///
    /// Descends from the root along the last populated slot of each apex
    /// level, then probes forward over base arrays that are already full.
    pub fn next_available_index(&self) -> Result<u64, BigArrayError> {
        let height = self.height()?;
        let mut number = 0;
        for level in (1..height).rev() {
            let slot = self
                .recorder
                .max_version(self.array_id(level, number))?
                .unwrap_or(0);
            number = number * self.array_size + slot;
        }

        let mut base = number;
        loop {
            match self.recorder.max_version(self.array_id(0, base))? {
                None => return Ok(base * self.array_size),
                Some(last) if last + 1 < self.array_size => {
                    return Ok(base * self.array_size + last + 1)
                }
                Some(_) => base += 1,
            }
        }
    }

    /// Write an item at a known position
    ///
    /// Fails with [`BigArrayError::Concurrency`] if the position is taken.
    pub fn assign(&self, index: u64, item: &T) -> Result<(), BigArrayError> {
        let base = index / self.array_size;
        let offset = index % self.array_size;
        let event = StoredEvent::new(
            self.array_id(0, base),
            offset,
            ITEM_TOPIC,
            serde_json::to_vec(item)?,
        );
        match self.recorder.insert_events(&[event]) {
            Ok(_) => {}
            Err(RecordError::Concurrency { .. }) => {
                return Err(BigArrayError::Concurrency { index });
            }
            Err(e) => return Err(e.into()),
        }
        if offset == 0 {
            self.register(base, index)?;
        }
        Ok(())
    }

    /// Append at the discovered frontier, once
    pub fn try_append(&self, item: &T) -> Result<u64, BigArrayError> {
        let index = self.next_available_index()?;
        self.assign(index, item)?;
        Ok(index)
    }

    /// Append, re-discovering the frontier after each collision
    pub fn append(&self, item: &T) -> Result<u64, BigArrayError> {
        for attempt in 1..=self.max_append_attempts {
            match self.try_append(item) {
                Err(BigArrayError::Concurrency { index }) => {
                    tracing::debug!(index, attempt, "big array position taken, retrying");
                }
                other => return other,
            }
        }
        Err(BigArrayError::Exhausted {
            attempts: self.max_append_attempts,
        })
    }

    /// Append at positions issued by an external sequence
    ///
    /// Positions already in use are skipped and the sequence is asked again.
    pub fn append_with(&self, sequence: &dyn IntegerSequence, item: &T) -> Result<u64, BigArrayError> {
        for _ in 0..self.max_append_attempts {
            let index = sequence.next();
            match self.assign(index, item) {
                Ok(()) => return Ok(index),
                Err(BigArrayError::Concurrency { index }) => {
                    tracing::debug!(index, "sequence issued a used position, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Err(BigArrayError::Exhausted {
            attempts: self.max_append_attempts,
        })
    }

    pub fn get(&self, index: u64) -> Result<Option<T>, BigArrayError> {
        let offset = index % self.array_size;
        let query = EventQuery::up_to(offset).with_gt(offset.checked_sub(1));
        let found = self
            .recorder
            .select_events(self.array_id(0, index / self.array_size), &query)?;
        match found.first() {
            Some(event) => Ok(Some(serde_json::from_slice(&event.state)?)),
            None => Ok(None),
        }
    }

    /// Assigned positions in `start..end`, one base array fetched at a time
    pub fn range(&self, start: u64, end: u64) -> BigArrayRange<'_, T, R> {
        BigArrayRange {
            array: self,
            next: start,
            end,
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    /// Record references from the apex levels down to a newly started base
    /// array, then raise the root height if needed
    ///
    /// Every write is at-most-once, so concurrent or repeated registration
    /// is harmless.
    fn register(&self, base: u64, index: u64) -> Result<(), BigArrayError> {
        let height = self.height_for(index);
        let mut number = base;
        for level in 1..height {
            let parent = number / self.array_size;
            let slot = number % self.array_size;
            self.write_once(self.array_id(level, parent), slot, REF_TOPIC, &number)?;
            number = parent;
        }
        self.write_once(self.root_id(), u64::from(height - 1), ROOT_TOPIC, &height)
    }

    fn write_once<V: Serialize>(
        &self,
        id: Uuid,
        version: u64,
        topic: &str,
        value: &V,
    ) -> Result<(), BigArrayError> {
        let event = StoredEvent::new(id, version, topic, serde_json::to_vec(value)?);
        match self.recorder.insert_events(&[event]) {
            Ok(_) | Err(RecordError::Concurrency { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Lazy iterator over assigned positions of a [`BigArray`]
pub struct BigArrayRange<'a, T, R: ?Sized> {
    array: &'a BigArray<T, R>,
    next: u64,
    end: u64,
    buffer: VecDeque<(u64, T)>,
    failed: bool,
}

impl<T, R> BigArrayRange<'_, T, R>
where
    T: Serialize + DeserializeOwned,
    R: AggregateRecorder + ?Sized,
{
    fn fill(&mut self) -> Result<(), BigArrayError> {
        let size = self.array.array_size;
        while self.buffer.is_empty() && self.next < self.end {
            let base = self.next / size;
            let first = self.next % size;
            let last = (self.end - 1 - base * size).min(size - 1);
            let query = EventQuery::up_to(last).with_gt(first.checked_sub(1));
            for event in self
                .array
                .recorder
                .select_events(self.array.array_id(0, base), &query)?
            {
                let item = serde_json::from_slice(&event.state)?;
                self.buffer
                    .push_back((base * size + event.originator_version, item));
            }
            self.next = (base + 1) * size;
        }
        Ok(())
    }
}

impl<T, R> Iterator for BigArrayRange<'_, T, R>
where
    T: Serialize + DeserializeOwned,
    R: AggregateRecorder + ?Sized,
{
    type Item = Result<(u64, T), BigArrayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Err(e) = self.fill() {
            self.failed = true;
            return Some(Err(e));
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Notification log whose items live in a [`BigArray`]
///
/// Writers append to it directly instead of going through an
/// `Application`, whose log is always read from its recorder. Followers
/// consume it like any other [`NotificationLog`].
///
/// Notification ids are array index + 1. A position left empty (a writer
/// died between discovering and writing it) blocks readers until
/// `hole_horizon` later positions are filled, after which it is skipped.
pub struct BigArrayNotificationLog<R: ?Sized> {
    array: BigArray<StoredEvent, R>,
    section_size: u64,
    hole_horizon: u64,
}

impl<R: AggregateRecorder + ?Sized> BigArrayNotificationLog<R> {
    pub fn new(array: BigArray<StoredEvent, R>, section_size: u64, hole_horizon: u64) -> Self {
        Self {
            array,
            section_size: section_size.max(1),
            hole_horizon,
        }
    }

    /// Log for an application, with its array named after the application
    ///
    /// Every process building the log from the same configuration addresses
    /// the same arrays.
    pub fn from_config(
        application: &ApplicationConfig,
        bigarray: &BigArrayConfig,
        recorder: Arc<R>,
    ) -> Self {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, application.name.as_bytes());
        let array = BigArray::new(id, bigarray.array_size, recorder)
            .with_max_append_attempts(bigarray.max_append_attempts);
        Self::new(array, application.section_size, bigarray.hole_horizon)
    }

    pub fn array(&self) -> &BigArray<StoredEvent, R> {
        &self.array
    }

    /// Append an event, returning its notification id
    pub fn append(&self, event: &StoredEvent) -> Result<u64, LogError> {
        Ok(self.array.append(event)? + 1)
    }

    /// Append at a position issued by an external sequence
    pub fn append_with(&self, sequence: &dyn IntegerSequence, event: &StoredEvent) -> Result<u64, LogError> {
        Ok(self.array.append_with(sequence, event)? + 1)
    }

    /// Id of the latest notification (0 when empty)
    pub fn max_notification_id(&self) -> Result<u64, LogError> {
        Ok(self.array.next_available_index()?)
    }

    fn is_lost(&self, index: u64, frontier: u64) -> bool {
        frontier >= index.saturating_add(1).saturating_add(self.hole_horizon)
    }

    /// Scan notifications from `start` up to `end` (inclusive ids)
    ///
    /// Returns the items and whether the scan reached `end` without being
    /// stopped by an unresolved hole.
    fn scan(
        &self,
        start: u64,
        end: Option<u64>,
        limit: usize,
        topics: &[String],
    ) -> Result<(Vec<Notification>, bool), LogError> {
        let frontier = self.array.next_available_index()?;
        let from = start.max(1) - 1;
        let to = end.map_or(frontier, |e| e.min(frontier));
        let complete = end.is_some_and(|e| e <= frontier);

        let mut items = Vec::new();
        let mut expected = from;
        for entry in self.array.range(from, to) {
            let (index, event) = entry?;
            if index > expected && !self.is_lost(index - 1, frontier) {
                return Ok((items, false));
            }
            expected = index + 1;
            let notification = event.into_notification(index + 1);
            if notification.matches_topics(topics) {
                items.push(notification);
                if items.len() >= limit {
                    return Ok((items, complete));
                }
            }
        }
        if expected < to && !self.is_lost(to - 1, frontier) {
            return Ok((items, false));
        }
        Ok((items, complete))
    }
}

impl<R: AggregateRecorder + ?Sized> NotificationLog for BigArrayNotificationLog<R> {
    fn section(&self, section_id: &str) -> Result<Section, LogError> {
        let (start, limit) =
            resolve_window(section_id, self.section_size, || self.max_notification_id())?;
        if limit == 0 {
            return Ok(present(Vec::new(), start, limit, self.section_size, false));
        }
        let end = start.saturating_add(limit - 1);
        let (items, complete) = self.scan(start, Some(end), limit as usize, &[])?;
        Ok(present(items, start, limit, self.section_size, complete))
    }

    fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, LogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self.scan(start, None, limit, topics)?.0)
    }
}

#[cfg(test)]
#[path = "bigarray_tests.rs"]
mod tests;
