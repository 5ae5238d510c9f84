// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal writer for durable appends
//!
//! Each append is fsync'd before it returns.

use super::entry::{Commit, JournalEntry};
use super::reader::JournalReader;
use crate::StorageError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JournalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    machine_id: String,
    /// Length of the durable prefix
    len: u64,
}

impl JournalWriter {
    /// Open or create a journal, continuing its sequence numbers
    ///
    /// The journal must not have a corrupt tail; see [`JournalReader::repair`].
    pub fn open(path: &Path, machine_id: &str) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let validation = JournalReader::open(path).validate()?;
        let next_sequence = validation.last_valid_sequence.map_or(0, |s| s + 1);

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
            machine_id: machine_id.to_string(),
            len,
        })
    }

    /// Append a commit, returning its sequence number once it is durable
    pub fn append(&mut self, commit: Commit) -> Result<u64, StorageError> {
        let sequence = self.next_sequence;
        let entry = JournalEntry::new(sequence, &self.machine_id, commit);
        let mut line = entry.to_line()?;
        line.push('\n');

        let written = self
            .file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.sync_all());
        if let Err(e) = written {
            // Drop any partial line so later appends stay readable
            if let Err(truncate) = self.file.set_len(self.len) {
                tracing::error!(error = %truncate, "failed to drop partial journal line");
            }
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Next sequence number to be assigned
    pub fn sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the journal
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
