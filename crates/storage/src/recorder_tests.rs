// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn event(id: Uuid, version: u64) -> StoredEvent {
    StoredEvent::new(id, version, "t", format!("{{\"v\":{version}}}").into_bytes())
}

fn journal_path(dir: &TempDir) -> PathBuf {
    dir.path().join("journal.jsonl")
}

#[test]
fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let id = Uuid::new_v4();
    {
        let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
        recorder.insert_events(&[event(id, 0), event(id, 1)]).unwrap();
        recorder
            .insert_events_with_tracking(&[event(id, 2)], &Tracking::new("up", 9))
            .unwrap();
    }

    let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
    assert_eq!(recorder.len(), 3);
    assert_eq!(recorder.max_version(id).unwrap(), Some(2));
    assert_eq!(recorder.max_notification_id().unwrap(), 3);
    assert_eq!(recorder.max_tracking_id("up").unwrap(), 9);

    let ids: Vec<u64> = recorder
        .select_notifications(1, 10, &[])
        .unwrap()
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn conflicting_batch_is_not_journaled() {
    let dir = TempDir::new().unwrap();
    let id = Uuid::new_v4();
    let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
    recorder.insert_events(&[event(id, 0)]).unwrap();
    let size = std::fs::metadata(journal_path(&dir)).unwrap().len();

    let err = recorder
        .insert_events(&[event(Uuid::new_v4(), 0), event(id, 0)])
        .unwrap_err();
    assert!(err.is_concurrency());
    assert_eq!(std::fs::metadata(journal_path(&dir)).unwrap().len(), size);
}

#[test]
fn already_processed_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
    let tracking = Tracking::new("up", 1);

    let first = recorder
        .insert_events_with_tracking(&[event(Uuid::new_v4(), 0)], &tracking)
        .unwrap();
    assert_eq!(first, CommitOutcome::Recorded(vec![1]));
    let size = std::fs::metadata(journal_path(&dir)).unwrap().len();

    let again = recorder
        .insert_events_with_tracking(&[event(Uuid::new_v4(), 0)], &tracking)
        .unwrap();
    assert_eq!(again, CommitOutcome::AlreadyProcessed);
    assert_eq!(std::fs::metadata(journal_path(&dir)).unwrap().len(), size);
}

#[test]
fn tracking_without_events_is_durable() {
    let dir = TempDir::new().unwrap();
    {
        let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
        recorder
            .insert_events_with_tracking(&[], &Tracking::new("up", 4))
            .unwrap();
    }
    let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
    assert!(recorder.has_tracking_id("up", 4).unwrap());
    assert!(recorder.is_empty());
}

#[test]
fn torn_tail_is_ignored_and_dropped_on_open() {
    let dir = TempDir::new().unwrap();
    let id = Uuid::new_v4();
    {
        let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
        recorder.insert_events(&[event(id, 0)]).unwrap();
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(journal_path(&dir))
        .unwrap();
    file.write_all(b"{\"sequence\":1,\"commit\":{\"eve").unwrap();
    drop(file);

    let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
    assert_eq!(recorder.len(), 1);

    // New commits land after the valid prefix and survive another reopen
    recorder.insert_events(&[event(id, 1)]).unwrap();
    drop(recorder);
    let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
    assert_eq!(recorder.max_version(id).unwrap(), Some(1));
}

#[test]
fn standalone_repair_reports_removed_bytes() {
    let dir = TempDir::new().unwrap();
    {
        let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
        recorder.insert_events(&[event(Uuid::new_v4(), 0)]).unwrap();
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(journal_path(&dir))
        .unwrap();
    file.write_all(b"garbage").unwrap();
    drop(file);

    assert_eq!(FileRecorder::repair(&journal_path(&dir)).unwrap(), 7);
    assert_eq!(FileRecorder::repair(&journal_path(&dir)).unwrap(), 0);
}

#[test]
fn concurrent_writers_on_one_version_exactly_one_wins() {
    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(FileRecorder::open(&journal_path(&dir)).unwrap());
    let id = Uuid::new_v4();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let recorder = Arc::clone(&recorder);
            thread::spawn(move || recorder.insert_events(&[event(id, 0)]))
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.is_ok())
        .count();

    assert_eq!(wins, 1);
    drop(recorder);
    let reopened = FileRecorder::open(&journal_path(&dir)).unwrap();
    assert_eq!(reopened.len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn reopen_preserves_notification_order(batches in proptest::collection::vec(1u64..4, 1..8)) {
        let dir = TempDir::new().unwrap();
        let mut expected = Vec::new();
        {
            let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
            for size in batches {
                let id = Uuid::new_v4();
                let batch: Vec<_> = (0..size).map(|v| event(id, v)).collect();
                recorder.insert_events(&batch).unwrap();
                expected.extend(batch.into_iter().map(|e| (e.originator_id, e.originator_version)));
            }
        }
        let recorder = FileRecorder::open(&journal_path(&dir)).unwrap();
        let actual: Vec<_> = recorder
            .select_notifications(1, usize::MAX, &[])
            .unwrap()
            .into_iter()
            .map(|n| (n.originator_id, n.originator_version))
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
