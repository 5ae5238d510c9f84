//! Process application specs
//!
//! Verify that followers count each trick exactly once under the
//! single-threaded and multi-threaded runners, including across restarts.

use crate::prelude::*;
use herald_core::{CommitOutcome, ProcessRecorder, Tracking};
use herald_engine::{Follower, Leader, MultiThreadedRunner, SingleThreadedRunner};
use similar_asserts::assert_eq;
use std::path::Path;

type Counting = ProcessApplication<FileRecorder, Counters>;

fn open_dogs(dir: &Path) -> Arc<Application<FileRecorder>> {
    Arc::new(Application::new(
        &ApplicationConfig::named("dogs"),
        Arc::new(FileRecorder::open(&dir.join("dogs.jsonl")).unwrap()),
    ))
}

fn open_counters(dir: &Path) -> Arc<Counting> {
    Arc::new(ProcessApplication::new(
        &ApplicationConfig::named("counters"),
        Arc::new(FileRecorder::open(&dir.join("counters.jsonl")).unwrap()),
        Counters,
    ))
}

fn system(dogs: &Arc<Application<FileRecorder>>, counters: &Arc<Counting>) -> System {
    let mut system = System::new();
    system
        .add_application(Arc::clone(dogs))
        .unwrap()
        .add_process(Arc::clone(counters))
        .unwrap()
        .pipe(["dogs", "counters"])
        .unwrap();
    system
}

#[test]
fn tricks_are_counted_exactly_once_across_restarts() {
    let dir = TempDir::new().unwrap();
    {
        let dogs = open_dogs(dir.path());
        let counters = open_counters(dir.path());
        let mut runner = SingleThreadedRunner::new(system(&dogs, &counters), &RunnerConfig::default());
        runner.start().unwrap();

        teach(&dogs, "Fido", &["roll over", "sit"]);
        assert_eq!(count(&*counters, "roll over"), 1);
        runner.stop();

        // Recorded while nobody is following
        teach(&dogs, "Rex", &["roll over"]);
    }

    let dogs = open_dogs(dir.path());
    let counters = open_counters(dir.path());
    assert_eq!(counters.position("dogs").unwrap(), 3);

    let mut runner = SingleThreadedRunner::new(system(&dogs, &counters), &RunnerConfig::default());
    runner.start().unwrap();
    assert_eq!(count(&*counters, "roll over"), 2);
    assert_eq!(count(&*counters, "sit"), 1);

    // Redelivering everything changes nothing
    let everything = dogs.notification_log().select(1, 100, &[]).unwrap();
    let before = counters.application().recorder().max_notification_id().unwrap();
    counters.process_notifications("dogs", everything).unwrap();
    assert_eq!(counters.application().recorder().max_notification_id().unwrap(), before);
    assert_eq!(count(&*counters, "roll over"), 2);
}

#[test]
fn recommitting_a_tracked_notification_is_a_no_op() {
    let recorder = MemoryRecorder::new();
    let tracking = Tracking::new("dogs", 4);

    let first = recorder.insert_events_with_tracking(&[], &tracking).unwrap();
    assert!(matches!(first, CommitOutcome::Recorded(_)));
    let again = recorder.insert_events_with_tracking(&[], &tracking).unwrap();
    assert!(matches!(again, CommitOutcome::AlreadyProcessed));
    assert_eq!(recorder.max_tracking_id("dogs").unwrap(), 4);
}

#[tokio::test]
async fn threaded_runner_converges_on_a_chain() {
    let dir = TempDir::new().unwrap();
    let dogs = open_dogs(dir.path());
    let counters = open_counters(dir.path());
    teach(&dogs, "Fido", &["sit"]);

    let mut runner = MultiThreadedRunner::new(system(&dogs, &counters), fast_runner());
    runner.start().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let dogs = Arc::clone(&dogs);
            std::thread::spawn(move || teach(&dogs, &format!("dog-{n}"), &["sit", "stay"]))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(eventually(|| count(&*counters, "sit") == 5 && count(&*counters, "stay") == 4).await);
    runner.stop().await.unwrap();

    let last = dogs.recorder().max_notification_id().unwrap();
    assert_eq!(last, 14);
    assert_eq!(counters.position("dogs").unwrap(), last);
    assert_eq!(counters.name(), "counters");
}
