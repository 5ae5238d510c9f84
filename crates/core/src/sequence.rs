// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integer sequence abstractions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Issues integers that are unique among callers sharing the sequence
pub trait IntegerSequence: Send + Sync {
    fn next(&self) -> u64;
}

/// In-process counter
///
/// Clones share the same counter.
#[derive(Clone, Default)]
pub struct AtomicSequence {
    counter: Arc<AtomicU64>,
}

impl AtomicSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter whose first issued value is `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(first)),
        }
    }
}

impl IntegerSequence for AtomicSequence {
    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
