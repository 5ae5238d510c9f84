// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal lines.
//!
//! Each line holds a sequence number, timestamp, machine id, one committed
//! batch and a CRC32 checksum of the serialized batch.

use crate::StorageError;
use herald_core::{StoredEvent, Tracking};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One atomic recorder write: a batch of events and an optional tracking row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub events: Vec<StoredEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<Tracking>,
}

impl Commit {
    pub fn new(events: Vec<StoredEvent>, tracking: Option<Tracking>) -> Self {
        Self { events, tracking }
    }
}

/// A single line of the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonically increasing sequence number
    pub sequence: u64,
    /// Microseconds since Unix epoch
    pub timestamp_micros: u64,
    pub machine_id: String,
    pub commit: Commit,
    /// CRC32 of the serialized commit
    pub checksum: u32,
}

impl JournalEntry {
    /// Stamp a commit with the current time
    pub fn new(sequence: u64, machine_id: &str, commit: Commit) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| since.as_micros() as u64);
        Self::new_with_timestamp(sequence, now, machine_id, commit)
    }

    pub fn new_with_timestamp(
        sequence: u64,
        timestamp_micros: u64,
        machine_id: &str,
        commit: Commit,
    ) -> Self {
        Self {
            sequence,
            timestamp_micros,
            machine_id: machine_id.to_owned(),
            checksum: checksum_of(&commit),
            commit,
        }
    }

    /// True when the stored checksum still matches the commit
    pub fn verify(&self) -> bool {
        checksum_of(&self.commit) == self.checksum
    }

    pub fn to_line(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(line)?)
    }
}

fn checksum_of(commit: &Commit) -> u32 {
    // Strings, integers and byte vectors cannot fail to serialize
    crc32fast::hash(&serde_json::to_vec(commit).unwrap_or_default())
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
