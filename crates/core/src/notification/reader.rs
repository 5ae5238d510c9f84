// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Positioned reader over a notification log

use super::{LogError, NotificationLog, Section, CURRENT_SECTION};
use crate::event::Notification;
use std::collections::VecDeque;

/// Follows a notification log from a remembered position
///
/// The position is the id of the last notification yielded (0 before
/// anything has been read).
pub struct NotificationLogReader<L> {
    log: L,
    position: u64,
}

impl<L: NotificationLog> NotificationLogReader<L> {
    pub fn new(log: L) -> Self {
        Self { log, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Notifications after the current position
    pub fn read(&mut self) -> ReadIter<'_, L> {
        let start = self.position.saturating_add(1);
        self.read_from(start)
    }

    /// Notifications with `id >= start`, paging through sections
    pub fn read_from(&mut self, start: u64) -> ReadIter<'_, L> {
        ReadIter {
            reader: self,
            start: start.max(1),
            buffer: VecDeque::new(),
            next_section: None,
            state: ReadState::Locate,
        }
    }

    /// Up to `limit` notifications after the position in a single request
    ///
    /// Advances the position past everything returned.
    pub fn select(&mut self, limit: usize, topics: &[String]) -> Result<Vec<Notification>, LogError> {
        let items = self.log.select(self.position + 1, limit, topics)?;
        if let Some(last) = items.last() {
            self.position = last.id;
        }
        Ok(items)
    }
}

enum ReadState {
    Locate,
    Reading,
    Done,
}

/// Lazy iterator over notifications, fetching one section at a time
pub struct ReadIter<'a, L> {
    reader: &'a mut NotificationLogReader<L>,
    start: u64,
    buffer: VecDeque<Notification>,
    next_section: Option<String>,
    state: ReadState,
}

impl<L: NotificationLog> ReadIter<'_, L> {
    /// Find the section holding `start`, walking back from the current one
    fn locate(&mut self) -> Result<(), LogError> {
        let mut section = self.reader.log.section(CURRENT_SECTION)?;
        loop {
            let first = section.items.first().map(|n| n.id);
            match (first, section.previous_id.take()) {
                (Some(first), Some(previous)) if first > self.start => {
                    section = self.reader.log.section(&previous)?;
                }
                (None, Some(previous)) => {
                    // Empty current section right after a full one
                    section = self.reader.log.section(&previous)?;
                }
                _ => break,
            }
        }
        self.load(section);
        Ok(())
    }

    fn load(&mut self, section: Section) {
        let start = self.start;
        self.buffer
            .extend(section.items.into_iter().filter(|n| n.id >= start));
        self.next_section = section.next_id;
    }
}

impl<L: NotificationLog> Iterator for ReadIter<'_, L> {
    type Item = Result<Notification, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ReadState::Done => return None,
                ReadState::Locate => {
                    self.state = ReadState::Reading;
                    if let Err(e) = self.locate() {
                        self.state = ReadState::Done;
                        return Some(Err(e));
                    }
                }
                ReadState::Reading => {
                    if let Some(notification) = self.buffer.pop_front() {
                        self.reader.position = notification.id;
                        return Some(Ok(notification));
                    }
                    let Some(next) = self.next_section.take() else {
                        self.state = ReadState::Done;
                        return None;
                    };
                    match self.reader.log.section(&next) {
                        Ok(section) => self.load(section),
                        Err(e) => {
                            self.state = ReadState::Done;
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
