// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only commit journal

mod entry;
mod reader;
mod writer;

pub use entry::{Commit, JournalEntry};
pub use reader::{JournalCorruption, JournalEntryIter, JournalReadError, JournalReader, JournalValidation};
pub use writer::JournalWriter;
