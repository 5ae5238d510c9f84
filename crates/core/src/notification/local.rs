// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification log over an application recorder

use super::{present, resolve_window, LogError, NotificationLog, Section};
use crate::event::Notification;
use crate::recorder::ApplicationRecorder;
use std::sync::Arc;

/// Default number of notifications per section
pub const DEFAULT_SECTION_SIZE: u64 = 10;

/// Sections read straight from an [`ApplicationRecorder`]
pub struct LocalNotificationLog<R: ?Sized> {
    recorder: Arc<R>,
    section_size: u64,
}

impl<R: ?Sized> Clone for LocalNotificationLog<R> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
            section_size: self.section_size,
        }
    }
}

impl<R: ApplicationRecorder + ?Sized> LocalNotificationLog<R> {
    pub fn new(recorder: Arc<R>, section_size: u64) -> Self {
        Self {
            recorder,
            section_size: section_size.max(1),
        }
    }

    pub fn section_size(&self) -> u64 {
        self.section_size
    }

    pub fn max_notification_id(&self) -> Result<u64, LogError> {
        Ok(self.recorder.max_notification_id()?)
    }
}

impl<R: ApplicationRecorder + ?Sized> NotificationLog for LocalNotificationLog<R> {
    fn section(&self, section_id: &str) -> Result<Section, LogError> {
        let (start, limit) = resolve_window(section_id, self.section_size, || {
            Ok(self.recorder.max_notification_id()?)
        })?;
        let items = if limit == 0 {
            Vec::new()
        } else {
            self.recorder.select_notifications(start, limit as usize, &[])?
        };
        tracing::trace!(section_id, start, limit, found = items.len(), "presented section");
        let full = limit > 0 && items.len() as u64 == limit;
        Ok(present(items, start, limit, self.section_size, full))
    }

    fn select(
        &self,
        start: u64,
        limit: usize,
        topics: &[String],
    ) -> Result<Vec<Notification>, LogError> {
        Ok(self.recorder.select_notifications(start.max(1), limit, topics)?)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
