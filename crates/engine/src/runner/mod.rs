// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System runners
//!
//! - [`SingleThreadedRunner`]: prompts are handled synchronously in the
//!   call stack of the save that caused them
//! - [`MultiThreadedRunner`]: one tokio task per edge
//! - [`MultiProcessRunner`]: one tokio task per edge, leaders reached over
//!   sockets

mod multiprocess;
mod single;
mod threaded;

pub use multiprocess::MultiProcessRunner;
pub use single::SingleThreadedRunner;
pub use threaded::MultiThreadedRunner;

use std::time::Duration;

/// Exponential backoff between failed attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt; doubles up to the ceiling
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
