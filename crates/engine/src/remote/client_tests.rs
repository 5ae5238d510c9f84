// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::remote::UpstreamLog;
use herald_core::{
    AggregateRecorder, LocalNotificationLog, MemoryRecorder, NotificationLog,
    NotificationLogReader, StoredEvent,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::UnixListener;
use uuid::Uuid;

/// Serve `log` on a socket in a fresh temp dir until the test ends
fn serve(log: Arc<dyn NotificationLog>) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.sock");
    let listener = UnixListener::bind(&path).unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let (mut reader, mut writer) = stream.into_split();
            let Ok(request) = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await else {
                continue;
            };
            let response = match request {
                Request::Ping => Response::Pong,
                Request::Section { section_id } => match log.section(&section_id) {
                    Ok(section) => Response::Section { section },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                },
                Request::Select {
                    start,
                    limit,
                    topics,
                } => match log.select(start, limit, &topics) {
                    Ok(items) => Response::Notifications { items },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                },
            };
            let _ = protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await;
        }
    });
    (dir, path)
}

fn log_with(count: u64) -> Arc<dyn NotificationLog> {
    let recorder = Arc::new(MemoryRecorder::new());
    let id = Uuid::new_v4();
    let events: Vec<_> = (0..count)
        .map(|v| StoredEvent::new(id, v, if v % 2 == 0 { "even" } else { "odd" }, b"{}".to_vec()))
        .collect();
    recorder.insert_events(&events).unwrap();
    Arc::new(LocalNotificationLog::new(recorder, 5))
}

#[tokio::test]
async fn ping_pong() {
    let (_dir, path) = serve(log_with(0));
    RemoteNotificationLog::new(&path).ping().await.unwrap();
}

#[tokio::test]
async fn sections_match_the_served_log() {
    let log = log_with(7);
    let (_dir, path) = serve(Arc::clone(&log));
    let remote = RemoteNotificationLog::new(&path);

    let section = remote.section("current").await.unwrap();
    assert_eq!(section, log.section("current").unwrap());
    assert_eq!(section.id.as_deref(), Some("6,7"));
    assert_eq!(section.previous_id.as_deref(), Some("1,5"));
}

#[tokio::test]
async fn select_filters_topics_remotely() {
    let (_dir, path) = serve(log_with(6));
    let remote = RemoteNotificationLog::new(&path);

    let ids: Vec<u64> = UpstreamLog::select(&remote, 2, 10, &["odd".to_string()])
        .await
        .unwrap()
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec![2, 4, 6]);
}

#[tokio::test]
async fn server_errors_are_reported() {
    let (_dir, path) = serve(log_with(1));
    let err = RemoteNotificationLog::new(&path)
        .section("not-a-section")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Server(message) if message.contains("not-a-section")));
}

#[tokio::test]
async fn missing_socket_fails_to_connect() {
    let dir = TempDir::new().unwrap();
    let remote = RemoteNotificationLog::new(dir.path().join("absent.sock"))
        .with_timeout(Duration::from_millis(200));
    assert!(matches!(
        remote.ping().await,
        Err(RemoteError::Connect { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn reader_pages_a_remote_log_through_its_sections() {
    let (_dir, path) = serve(log_with(12));
    let log = BlockingRemoteLog::new(RemoteNotificationLog::new(&path), Handle::current());

    let (ids, position, first) = tokio::task::spawn_blocking(move || {
        let first = log.section("1,5").unwrap();
        let mut reader = NotificationLogReader::new(log);
        let ids: Vec<u64> = reader.read_from(1).map(|n| n.unwrap().id).collect();
        (ids, reader.position(), first)
    })
    .await
    .unwrap();

    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    assert_eq!(position, 12);
    assert_eq!(first.next_id.as_deref(), Some("6,10"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_remote_log_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let log = BlockingRemoteLog::new(
        RemoteNotificationLog::new(dir.path().join("absent.sock"))
            .with_timeout(Duration::from_millis(200)),
        Handle::current(),
    );

    let err = tokio::task::spawn_blocking(move || log.section("current").unwrap_err())
        .await
        .unwrap();
    assert!(matches!(err, LogError::Unavailable(_)));
}
