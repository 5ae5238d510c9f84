// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification logs
//!
//! A notification log presents an application's total order as linked
//! sections of consecutive notifications. Section ids are `"first,last"`
//! ranges; the special id `"current"` names the section holding the latest
//! notification. A section only links forward once it is full.

mod bigarray;
mod local;
mod reader;

pub use bigarray::{
    BigArray, BigArrayError, BigArrayNotificationLog, BigArrayRange, DEFAULT_ARRAY_SIZE,
    DEFAULT_HOLE_HORIZON, DEFAULT_MAX_APPEND_ATTEMPTS,
};
pub use local::{LocalNotificationLog, DEFAULT_SECTION_SIZE};
pub use reader::{NotificationLogReader, ReadIter};

use crate::event::Notification;
use crate::recorder::RecordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Section id naming the section that holds the latest notification
pub const CURRENT_SECTION: &str = "current";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid section id: {0}")]
    InvalidSectionId(String),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    BigArray(#[from] BigArrayError),
    /// The log lives elsewhere and could not be reached
    #[error("log unavailable: {0}")]
    Unavailable(String),
}

/// A page of consecutive notifications with links to its neighbours
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// `"first,last"` of the items present, or `None` when empty
    pub id: Option<String>,
    pub items: Vec<Notification>,
    pub previous_id: Option<String>,
    pub next_id: Option<String>,
}

/// A `"first,last"` range of notification ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionId {
    pub first: u64,
    pub last: u64,
}

impl SectionId {
    pub fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    /// Section of `size` aligned so that it contains `id`
    pub fn aligned(id: u64, size: u64) -> Self {
        let size = size.max(1);
        let first = (id.max(1) - 1) / size * size + 1;
        Self::new(first, first.saturating_add(size - 1))
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.first, self.last)
    }
}

impl FromStr for SectionId {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LogError::InvalidSectionId(s.to_string());
        let (first, last) = s.split_once(',').ok_or_else(invalid)?;
        let first = first.trim().parse().map_err(|_| invalid())?;
        let last = last.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(first, last))
    }
}

/// Read access to an application's notifications
pub trait NotificationLog: Send + Sync {
    /// Present a section by id (`"first,last"` or `"current"`)
    fn section(&self, section_id: &str) -> Result<Section, LogError>;

    /// Notifications with `id >= start`, at most `limit`, optionally filtered
    fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, LogError>;
}

impl<L: NotificationLog + ?Sized> NotificationLog for Arc<L> {
    fn section(&self, section_id: &str) -> Result<Section, LogError> {
        (**self).section(section_id)
    }

    fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, LogError> {
        (**self).select(start, limit, topics)
    }
}

impl<L: NotificationLog + ?Sized> NotificationLog for &L {
    fn section(&self, section_id: &str) -> Result<Section, LogError> {
        (**self).section(section_id)
    }

    fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, LogError> {
        (**self).select(start, limit, topics)
    }
}

/// Resolve a requested section id into a `(start, limit)` window
///
/// `latest` is the id of the latest notification, used for `"current"`.
pub(crate) fn resolve_window(
    section_id: &str,
    section_size: u64,
    latest: impl FnOnce() -> Result<u64, LogError>,
) -> Result<(u64, u64), LogError> {
    let requested = if section_id == CURRENT_SECTION {
        SectionId::aligned(latest()?, section_size)
    } else {
        section_id.parse::<SectionId>()?
    };
    let start = requested.first.max(1);
    let span = requested
        .last
        .checked_add(1)
        .ok_or_else(|| LogError::InvalidSectionId(section_id.to_string()))?
        .saturating_sub(start);
    Ok((start, span.min(section_size)))
}

/// Build a section from the items selected for a `(start, limit)` window
///
/// `complete` marks a window whose every position has been resolved, which
/// is when the section links forward.
pub(crate) fn present(
    items: Vec<Notification>,
    start: u64,
    limit: u64,
    section_size: u64,
    complete: bool,
) -> Section {
    let id = match (items.first(), items.last()) {
        (Some(first), Some(last)) => Some(SectionId::new(first.id, last.id).to_string()),
        _ => None,
    };
    // No forward link past the end of the id space
    let next_id = (complete && limit > 0)
        .then(|| {
            let first = start.checked_add(limit)?;
            Some(SectionId::new(first, first.checked_add(limit - 1)?).to_string())
        })
        .flatten();
    let previous_id = (start > section_size)
        .then(|| SectionId::new(start - section_size, start - 1).to_string());
    Section {
        id,
        items,
        previous_id,
        next_id,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
