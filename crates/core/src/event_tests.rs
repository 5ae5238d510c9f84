// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn notification_keeps_event_fields() {
    let id = Uuid::new_v4();
    let event = StoredEvent::new(id, 3, "dog.trick_added", b"{}".to_vec());
    let notification = event.clone().into_notification(42);

    assert_eq!(notification.id, 42);
    assert_eq!(notification.stored_event(), event);
}

#[test]
fn empty_topic_filter_matches_everything() {
    let n = StoredEvent::new(Uuid::new_v4(), 0, "a", vec![]).into_notification(1);
    assert!(n.matches_topics(&[]));
    assert!(n.matches_topics(&["a".to_string()]));
    assert!(!n.matches_topics(&["b".to_string()]));
}
