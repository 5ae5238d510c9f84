//! Shared fixtures for the specs

pub use herald_core::fixtures::{Counter, Dog};
pub use herald_core::{
    Aggregate, AggregateRecorder, Application, ApplicationConfig, ApplicationRecorder,
    MemoryRecorder, NotificationLog, NotificationLogReader, RunnerConfig,
};
pub use herald_engine::fixtures::Counters;
pub use herald_engine::{ProcessApplication, System};
pub use herald_storage::FileRecorder;
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tempfile::TempDir;

/// Register a dog and teach it some tricks in one save
pub fn teach<R: ApplicationRecorder + ?Sized>(dogs: &Application<R>, name: &str, tricks: &[&str]) {
    let mut dog = Dog::register(name).unwrap();
    for trick in tricks {
        dog.add_trick(trick).unwrap();
    }
    dogs.save(&mut dog).unwrap();
}

pub fn count<R, P>(counters: &ProcessApplication<R, P>, trick: &str) -> u64
where
    R: herald_core::ProcessRecorder + ?Sized,
    P: herald_engine::Policy,
{
    counters
        .application()
        .get::<Counter>(Counter::id_for(trick))
        .map(|c| c.count)
        .unwrap_or(0)
}

pub fn fast_runner() -> RunnerConfig {
    RunnerConfig {
        batch_size: 3,
        poll_interval: Duration::from_millis(20),
        pull_timeout: Duration::from_secs(1),
        backoff_initial: Duration::from_millis(10),
        backoff_max: Duration::from_millis(50),
        ..RunnerConfig::default()
    }
}

/// Poll until `check` holds or a few seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
