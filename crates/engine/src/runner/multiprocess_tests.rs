// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fixtures::Counters;
use crate::process::ProcessApplication;
use crate::remote::protocol::{self, Request, Response, DEFAULT_TIMEOUT};
use herald_core::fixtures::{Counter, Dog};
use herald_core::{Application, ApplicationConfig, MemoryRecorder, NotificationLog};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::UnixListener;

type Counting = ProcessApplication<MemoryRecorder, Counters>;

fn config() -> RunnerConfig {
    RunnerConfig {
        batch_size: 2,
        poll_interval: Duration::from_millis(20),
        pull_timeout: Duration::from_secs(1),
        backoff_initial: Duration::from_millis(10),
        backoff_max: Duration::from_millis(40),
        ..RunnerConfig::default()
    }
}

fn dogs() -> Arc<Application<MemoryRecorder>> {
    Arc::new(Application::new(
        &ApplicationConfig::named("dogs"),
        Arc::new(MemoryRecorder::new()),
    ))
}

fn counters() -> Arc<Counting> {
    Arc::new(ProcessApplication::new(
        &ApplicationConfig::named("counters"),
        Arc::new(MemoryRecorder::new()),
        Counters,
    ))
}

fn teach(dogs: &Application<MemoryRecorder>, tricks: &[&str]) {
    let mut dog = Dog::register("Fido").unwrap();
    for trick in tricks {
        dog.add_trick(trick).unwrap();
    }
    dogs.save(&mut dog).unwrap();
}

fn count(counters: &Counting, trick: &str) -> u64 {
    counters
        .application()
        .get::<Counter>(Counter::id_for(trick))
        .map(|c| c.count)
        .unwrap_or(0)
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Answer select requests for `log` on `path`
fn serve(log: Arc<dyn NotificationLog>, path: &Path) {
    let listener = UnixListener::bind(path).unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let (mut reader, mut writer) = stream.into_split();
            let response = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
                Ok(Request::Select {
                    start,
                    limit,
                    topics,
                }) => match log.select(start, limit, &topics) {
                    Ok(items) => Response::Notifications { items },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                },
                Ok(Request::Ping) => Response::Pong,
                Ok(_) => Response::Error {
                    message: "unsupported".to_string(),
                },
                Err(_) => continue,
            };
            let _ = protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await;
        }
    });
}

fn remote_system(counters: &Arc<Counting>) -> System {
    let mut system = System::new();
    system
        .add_remote("dogs")
        .unwrap()
        .add_process(Arc::clone(counters))
        .unwrap()
        .pipe(["dogs", "counters"])
        .unwrap();
    system
}

#[tokio::test]
async fn pulls_from_a_remote_leader() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("dogs.sock");
    let dogs = dogs();
    serve(Arc::new(dogs.notification_log().clone()), &socket);

    let counters = counters();
    let mut runner = MultiProcessRunner::new(remote_system(&counters), config())
        .with_endpoint("dogs", &socket);
    runner.start().unwrap();

    teach(&dogs, &["sit", "sit", "stay"]);
    assert!(eventually(|| count(&counters, "sit") == 2 && count(&counters, "stay") == 1).await);

    teach(&dogs, &["sit"]);
    assert!(eventually(|| count(&counters, "sit") == 3).await);
    runner.stop().await.unwrap();
    assert_eq!(counters.position("dogs").unwrap(), 6);
}

#[tokio::test]
async fn recovers_once_the_leader_is_reachable() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("dogs.sock");
    let dogs = dogs();
    teach(&dogs, &["beg"]);

    let counters = counters();
    let mut runner = MultiProcessRunner::new(remote_system(&counters), config())
        .with_endpoint("dogs", &socket);
    runner.start().unwrap();

    // Nothing is listening yet, so pulls fail and back off
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(count(&counters, "beg"), 0);

    serve(Arc::new(dogs.notification_log().clone()), &socket);
    assert!(eventually(|| count(&counters, "beg") == 1).await);
    runner.stop().await.unwrap();
}

#[tokio::test]
async fn local_leaders_are_read_in_process() {
    let dogs = dogs();
    let counters = counters();
    teach(&dogs, &["roll over"]);

    let mut system = System::new();
    system
        .add_application(Arc::clone(&dogs))
        .unwrap()
        .add_process(Arc::clone(&counters))
        .unwrap()
        .pipe(["dogs", "counters"])
        .unwrap();
    let mut runner = MultiProcessRunner::new(system, config());
    runner.start().unwrap();

    assert!(eventually(|| count(&counters, "roll over") == 1).await);
    runner.stop().await.unwrap();
}

#[tokio::test]
async fn remote_leader_needs_an_endpoint() {
    let counters = counters();
    let mut runner = MultiProcessRunner::new(remote_system(&counters), config());
    assert!(matches!(runner.start(), Err(RunnerError::NoEndpoint(name)) if name == "dogs"));
    assert!(!runner.is_running());
}
