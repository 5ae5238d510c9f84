//! Event store and notification log specs
//!
//! Verify the total order, section linking and reader restart behavior
//! over both in-memory and journal-backed recorders.

use crate::prelude::*;
use herald_core::StoredEvent;
use similar_asserts::assert_eq;
use uuid::Uuid;

fn event(originator_id: Uuid, version: u64) -> StoredEvent {
    StoredEvent::new(originator_id, version, "ledger:entry", b"{}".to_vec())
}

fn append_one_at_a_time<R: ApplicationRecorder>(recorder: &R, count: u64) -> Vec<u64> {
    let id = Uuid::new_v4();
    (0..count)
        .flat_map(|v| recorder.insert_events(&[event(id, v)]).unwrap())
        .collect()
}

#[test]
fn appends_are_numbered_in_commit_order() {
    let recorder = MemoryRecorder::new();
    assert_eq!(append_one_at_a_time(&recorder, 12), (1..=12).collect::<Vec<_>>());

    let dir = TempDir::new().unwrap();
    let file = FileRecorder::open(&dir.path().join("journal.jsonl")).unwrap();
    assert_eq!(append_one_at_a_time(&file, 12), (1..=12).collect::<Vec<_>>());
}

#[test]
fn sections_link_once_full() {
    let dogs = Application::new(
        &ApplicationConfig::named("dogs"),
        Arc::new(MemoryRecorder::new()),
    );
    let log = dogs.notification_log();

    teach(&dogs, "Fido", &["sit", "stay", "beg", "heel", "roll over", "shake"]);
    let section = log.section("1,10").unwrap();
    assert_eq!(section.items.len(), 7);
    assert_eq!(section.id.as_deref(), Some("1,7"));
    assert_eq!(section.next_id, None);

    teach(&dogs, "Rex", &["sit", "stay"]);
    let section = log.section("1,10").unwrap();
    assert_eq!(section.items.len(), 10);
    assert_eq!(section.next_id.as_deref(), Some("11,20"));

    let next = log.section("11,20").unwrap();
    assert_eq!(next.previous_id.as_deref(), Some("1,10"));
    assert!(next.items.is_empty());
    assert_eq!(log.section("current").unwrap(), log.section("1,10").unwrap());
}

#[test]
fn reader_restarts_from_a_saved_position() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dogs.jsonl");
    let saved = {
        let dogs = Application::new(
            &ApplicationConfig::named("dogs"),
            Arc::new(FileRecorder::open(&path).unwrap()),
        );
        teach(&dogs, "Fido", &["sit", "stay"]);

        let mut reader = NotificationLogReader::new(dogs.notification_log());
        let first: Vec<u64> = reader.read().map(|n| n.unwrap().id).collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(reader.read().count(), 0);
        reader.position()
    };

    let dogs = Application::new(
        &ApplicationConfig::named("dogs"),
        Arc::new(FileRecorder::open(&path).unwrap()),
    );
    teach(&dogs, "Rex", &["beg"]);

    let mut reader = NotificationLogReader::new(dogs.notification_log());
    let rest: Vec<u64> = reader.read_from(saved + 1).map(|n| n.unwrap().id).collect();
    assert_eq!(rest, vec![4, 5]);
}

#[test]
fn aggregates_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dogs.jsonl");
    let id = {
        let dogs = Application::new(
            &ApplicationConfig::named("dogs"),
            Arc::new(FileRecorder::open(&path).unwrap()),
        );
        let mut dog = Dog::register("Fido").unwrap();
        dog.add_trick("roll over").unwrap();
        dog.add_trick("play dead").unwrap();
        dogs.save(&mut dog).unwrap();
        dog.id()
    };

    let dogs = Application::new(
        &ApplicationConfig::named("dogs"),
        Arc::new(FileRecorder::open(&path).unwrap()),
    );
    let dog: Dog = dogs.get(id).unwrap();
    assert_eq!(dog.name, "Fido");
    assert_eq!(dog.tricks, vec!["roll over", "play dead"]);
}
