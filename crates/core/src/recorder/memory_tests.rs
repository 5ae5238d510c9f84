// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::thread;

fn event(id: Uuid, version: u64, topic: &str) -> StoredEvent {
    StoredEvent::new(id, version, topic, format!("{{\"v\":{}}}", version).into_bytes())
}

#[test]
fn insert_then_select_in_version_order() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();

    recorder
        .insert_events(&[event(id, 0, "created"), event(id, 1, "renamed")])
        .unwrap();
    recorder.insert_events(&[event(id, 2, "renamed")]).unwrap();

    let versions: Vec<_> = recorder
        .select_events(id, &EventQuery::all())
        .unwrap()
        .iter()
        .map(|e| e.originator_version)
        .collect();
    assert_eq!(versions, vec![0, 1, 2]);
    assert_eq!(recorder.max_version(id).unwrap(), Some(2));
}

#[test]
fn select_honours_bounds_and_direction() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    let batch: Vec<_> = (0..6).map(|v| event(id, v, "t")).collect();
    recorder.insert_events(&batch).unwrap();

    let window = recorder
        .select_events(id, &EventQuery::after(1).with_lte(Some(4)))
        .unwrap();
    assert_eq!(window.len(), 3);
    assert_eq!(window[0].originator_version, 2);

    let newest = recorder
        .select_events(
            id,
            &EventQuery {
                desc: true,
                limit: Some(2),
                ..EventQuery::default()
            },
        )
        .unwrap();
    assert_eq!(newest[0].originator_version, 5);
    assert_eq!(newest[1].originator_version, 4);
}

#[test]
fn unknown_aggregate_selects_nothing() {
    let recorder = MemoryRecorder::new();
    assert!(recorder
        .select_events(Uuid::new_v4(), &EventQuery::all())
        .unwrap()
        .is_empty());
    assert_eq!(recorder.max_version(Uuid::new_v4()).unwrap(), None);
}

#[test]
fn conflicting_batch_writes_nothing() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    recorder.insert_events(&[event(id, 0, "t")]).unwrap();

    let other = Uuid::new_v4();
    let err = recorder
        .insert_events(&[event(other, 0, "t"), event(id, 0, "t")])
        .unwrap_err();

    assert!(err.is_concurrency());
    assert!(recorder
        .select_events(other, &EventQuery::all())
        .unwrap()
        .is_empty());
    assert_eq!(recorder.max_notification_id().unwrap(), 1);
}

#[test]
fn duplicate_inside_batch_is_a_conflict() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    let err = recorder
        .insert_events(&[event(id, 0, "t"), event(id, 0, "t")])
        .unwrap_err();
    assert!(err.is_concurrency());
    assert!(recorder.is_empty());
}

#[test]
fn notifications_follow_commit_order() {
    let recorder = MemoryRecorder::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    assert_eq!(recorder.insert_events(&[event(a, 0, "a")]).unwrap(), vec![1]);
    assert_eq!(
        recorder
            .insert_events(&[event(b, 0, "b"), event(a, 1, "a")])
            .unwrap(),
        vec![2, 3]
    );

    let notifications = recorder.select_notifications(1, 10, &[]).unwrap();
    let ids: Vec<_> = notifications.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(notifications[1].originator_id, b);

    let tail = recorder.select_notifications(3, 10, &[]).unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].id, 3);
}

#[test]
fn notifications_filtered_by_topic() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    let batch = vec![event(id, 0, "a"), event(id, 1, "b"), event(id, 2, "a")];
    recorder.insert_events(&batch).unwrap();

    let only_a = recorder
        .select_notifications(1, 10, &["a".to_string()])
        .unwrap();
    let ids: Vec<_> = only_a.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 3]);

    let limited = recorder.select_notifications(1, 1, &[]).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn tracking_commit_is_idempotent() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    let tracking = Tracking::new("upstream", 7);

    let first = recorder
        .insert_events_with_tracking(&[event(id, 0, "t")], &tracking)
        .unwrap();
    assert_eq!(first, CommitOutcome::Recorded(vec![1]));

    let second = recorder
        .insert_events_with_tracking(&[event(id, 1, "t")], &tracking)
        .unwrap();
    assert_eq!(second, CommitOutcome::AlreadyProcessed);

    assert_eq!(recorder.max_version(id).unwrap(), Some(0));
    assert_eq!(recorder.max_tracking_id("upstream").unwrap(), 7);
    assert!(recorder.has_tracking_id("upstream", 7).unwrap());
    assert!(!recorder.has_tracking_id("upstream", 6).unwrap());
    assert_eq!(recorder.max_tracking_id("other").unwrap(), 0);
}

#[test]
fn tracking_commit_with_conflict_leaves_no_tracking_row() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    recorder.insert_events(&[event(id, 0, "t")]).unwrap();

    let err = recorder
        .insert_events_with_tracking(&[event(id, 0, "t")], &Tracking::new("up", 1))
        .unwrap_err();

    assert!(err.is_concurrency());
    assert!(!recorder.has_tracking_id("up", 1).unwrap());
}

#[test]
fn racing_writers_on_same_version_exactly_one_wins() {
    let recorder = MemoryRecorder::new();
    let id = Uuid::new_v4();
    recorder.insert_events(&[event(id, 0, "created")]).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let recorder = recorder.clone();
            thread::spawn(move || recorder.insert_events(&[event(id, 1, "changed")]))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_concurrency()))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);
    let versions: Vec<_> = recorder
        .select_events(id, &EventQuery::all())
        .unwrap()
        .iter()
        .map(|e| e.originator_version)
        .collect();
    assert_eq!(versions, vec![0, 1]);
}

proptest! {
    #[test]
    fn n_appends_give_ids_one_to_n(batches in proptest::collection::vec(1usize..5, 1..20)) {
        let recorder = MemoryRecorder::new();
        let mut expected = 0u64;
        for size in batches {
            let id = Uuid::new_v4();
            let batch: Vec<_> = (0..size as u64).map(|v| event(id, v, "t")).collect();
            let ids = recorder.insert_events(&batch).unwrap();
            for assigned in ids {
                expected += 1;
                prop_assert_eq!(assigned, expected);
            }
        }
        let all = recorder.select_notifications(1, usize::MAX, &[]).unwrap();
        prop_assert_eq!(all.len() as u64, expected);
        prop_assert!(all.iter().enumerate().all(|(i, n)| n.id == i as u64 + 1));
    }
}
