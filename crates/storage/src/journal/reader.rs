// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal reader with corruption detection
//!
//! An entry that fails to parse or verify marks the truncation point;
//! nothing after it is trusted.

use super::entry::JournalEntry;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalReadError {
    #[error("corrupted entry at line {line}: {reason}")]
    Corrupted { line: u64, reason: String },
    #[error("checksum mismatch at line {line}")]
    ChecksumMismatch { line: u64 },
    #[error("incomplete entry at line {line}")]
    Incomplete { line: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads a journal file; a missing file reads as empty
pub struct JournalReader {
    path: PathBuf,
}

impl JournalReader {
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Iterate over valid entries, stopping at the first corrupt one
    pub fn entries(&self) -> Result<JournalEntryIter, JournalReadError> {
        JournalEntryIter::new(&self.path, 0)
    }

    /// Iterate over entries starting at a byte offset that begins a line
    pub fn entries_from(&self, offset: u64) -> Result<JournalEntryIter, JournalReadError> {
        JournalEntryIter::new(&self.path, offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count valid entries and locate any corruption
    pub fn validate(&self) -> Result<JournalValidation, JournalReadError> {
        let mut iter = self.entries()?;
        let mut valid_entries = 0u64;
        let mut last_valid_sequence = None;
        let mut corruption = None;

        for entry_result in iter.by_ref() {
            match entry_result {
                Ok(entry) => {
                    valid_entries += 1;
                    last_valid_sequence = Some(entry.sequence);
                }
                Err(JournalReadError::Corrupted { line, reason }) => {
                    corruption = Some(JournalCorruption { line, reason });
                    break;
                }
                Err(JournalReadError::ChecksumMismatch { line }) => {
                    corruption = Some(JournalCorruption {
                        line,
                        reason: "checksum mismatch".to_string(),
                    });
                    break;
                }
                Err(JournalReadError::Incomplete { line }) => {
                    corruption = Some(JournalCorruption {
                        line,
                        reason: "incomplete entry".to_string(),
                    });
                    break;
                }
                Err(JournalReadError::Io(e)) => {
                    corruption = Some(JournalCorruption {
                        line: valid_entries + 1,
                        reason: format!("IO error: {}", e),
                    });
                    break;
                }
            }
        }

        Ok(JournalValidation {
            valid_entries,
            last_valid_sequence,
            valid_bytes: iter.last_valid_position(),
            corruption,
        })
    }

    /// Truncate the journal after its last valid entry
    ///
    /// Returns the number of bytes removed (0 when the journal is intact).
    pub fn repair(&self) -> Result<u64, JournalReadError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let validation = self.validate()?;
        if validation.corruption.is_none() {
            return Ok(0);
        }

        let old_size = std::fs::metadata(&self.path)?.len();
        let keep = validation.valid_bytes.min(old_size);
        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(keep)?;
        file.sync_all()?;

        tracing::warn!(
            path = %self.path.display(),
            removed = old_size - keep,
            valid_entries = validation.valid_entries,
            "truncated corrupt journal tail"
        );
        Ok(old_size - keep)
    }
}

/// Iterator over journal entries with position tracking
pub struct JournalEntryIter {
    reader: Option<BufReader<File>>,
    line_number: u64,
    /// Position after the last successfully read and validated entry
    last_valid_position: u64,
}

impl JournalEntryIter {
    fn new(path: &Path, offset: u64) -> Result<Self, JournalReadError> {
        let reader = match File::open(path) {
            Ok(mut file) => {
                file.seek(SeekFrom::Start(offset))?;
                Some(BufReader::new(file))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            reader,
            line_number: 0,
            last_valid_position: offset,
        })
    }

    pub fn last_valid_position(&self) -> u64 {
        self.last_valid_position
    }
}

impl Iterator for JournalEntryIter {
    type Item = Result<JournalEntry, JournalReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.read_next();
        if matches!(item, Some(Err(_))) {
            // Nothing after a corrupt entry is trusted
            self.reader = None;
        }
        item
    }
}

impl JournalEntryIter {
    fn read_next(&mut self) -> Option<Result<JournalEntry, JournalReadError>> {
        let reader = self.reader.as_mut()?;

        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;

                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    // A line without its newline was torn mid-write
                    if !line.ends_with('\n') {
                        return Some(Err(JournalReadError::Incomplete {
                            line: self.line_number,
                        }));
                    }

                    let entry = match JournalEntry::from_line(trimmed) {
                        Ok(e) => e,
                        Err(e) => {
                            return Some(Err(JournalReadError::Corrupted {
                                line: self.line_number,
                                reason: e.to_string(),
                            }));
                        }
                    };

                    if !entry.verify() {
                        return Some(Err(JournalReadError::ChecksumMismatch {
                            line: self.line_number,
                        }));
                    }

                    match reader.stream_position() {
                        Ok(position) => self.last_valid_position = position,
                        Err(e) => return Some(Err(e.into())),
                    }
                    return Some(Ok(entry));
                }
                Err(e) => return Some(Err(JournalReadError::Io(e))),
            }
        }
    }
}

/// Validation result for a journal file
#[derive(Debug)]
pub struct JournalValidation {
    pub valid_entries: u64,
    pub last_valid_sequence: Option<u64>,
    /// Byte length of the valid prefix
    pub valid_bytes: u64,
    pub corruption: Option<JournalCorruption>,
}

#[derive(Debug)]
pub struct JournalCorruption {
    pub line: u64,
    pub reason: String,
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
