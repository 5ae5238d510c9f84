// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herald_core::{AggregateRecorder, LocalNotificationLog, MemoryRecorder, StoredEvent};
use herald_engine::RemoteNotificationLog;
use tempfile::TempDir;
use tokio::net::UnixListener;
use uuid::Uuid;

fn log_with(count: u64) -> Arc<dyn NotificationLog> {
    let recorder = Arc::new(MemoryRecorder::new());
    let id = Uuid::new_v4();
    let events: Vec<_> = (0..count)
        .map(|v| StoredEvent::new(id, v, if v % 3 == 0 { "fizz" } else { "plain" }, b"{}".to_vec()))
        .collect();
    recorder.insert_events(&events).unwrap();
    Arc::new(LocalNotificationLog::new(recorder, 4))
}

#[tokio::test]
async fn requests_are_answered_from_the_log() {
    let log = log_with(6);

    assert_eq!(handle_request(Arc::clone(&log), Request::Ping).await, Response::Pong);

    let response = handle_request(
        Arc::clone(&log),
        Request::Select {
            start: 2,
            limit: 10,
            topics: vec!["fizz".to_string()],
        },
    )
    .await;
    let Response::Notifications { items } = response else {
        panic!("unexpected response: {response:?}");
    };
    let ids: Vec<u64> = items.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![4]);

    let response = handle_request(
        log,
        Request::Section {
            section_id: "1,4".to_string(),
        },
    )
    .await;
    let Response::Section { section } = response else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(section.items.len(), 4);
    assert_eq!(section.next_id.as_deref(), Some("5,8"));
}

#[tokio::test]
async fn log_errors_become_error_responses() {
    let response = handle_request(
        log_with(1),
        Request::Section {
            section_id: "first-to-last".to_string(),
        },
    )
    .await;
    assert!(matches!(response, Response::Error { message } if message.contains("first-to-last")));
}

#[tokio::test]
async fn connections_are_served_over_the_socket() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("herald.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let log = log_with(9);
    let served = Arc::clone(&log);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let _ = handle_connection(Arc::clone(&served), stream).await;
        }
    });

    let remote = RemoteNotificationLog::new(&path);
    remote.ping().await.unwrap();
    let section = remote.section("current").await.unwrap();
    assert_eq!(section, log.section("current").unwrap());
    assert_eq!(section.id.as_deref(), Some("9,9"));

    let items = remote.select(1, 100, &[]).await.unwrap();
    assert_eq!(items.len(), 9);
}

#[tokio::test]
async fn client_hanging_up_is_not_an_error() {
    let (client, server) = UnixStream::pair().unwrap();
    drop(client);
    handle_connection(log_with(0), server).await.unwrap();
}
