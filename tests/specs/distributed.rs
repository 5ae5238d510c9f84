//! Multi-process specs
//!
//! A writer records into a journal, `heraldd` serves that journal's log on
//! a socket, and a follower pulls from it with the multi-process runner.

use crate::prelude::*;
use herald_daemon::{handle_connection, startup, Config, DaemonState};
use herald_engine::{Follower, MultiProcessRunner, RemoteNotificationLog};
use similar_asserts::assert_eq;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Deployment {
    _project: TempDir,
    _state: TempDir,
    _sockets: TempDir,
    config: Config,
}

fn deployment() -> Deployment {
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("herald.toml"),
        "[application]\nname = \"dogs\"\nsection_size = 4\n",
    )
    .unwrap();
    let state = TempDir::new().unwrap();
    let sockets = TempDir::new().unwrap();
    let config = Config::with_dirs(project.path(), state.path(), sockets.path()).unwrap();
    std::fs::create_dir_all(config.journal_path.parent().unwrap()).unwrap();
    Deployment {
        _project: project,
        _state: state,
        _sockets: sockets,
        config,
    }
}

/// Run the daemon's accept loop until `stop` fires, then shut it down
fn serve(mut daemon: DaemonState) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = daemon.listener.accept() => {
                    let Ok((stream, _)) = accepted else { continue };
                    let log = Arc::clone(&daemon.log);
                    tokio::spawn(async move {
                        let _ = handle_connection(log, stream).await;
                    });
                }
                _ = &mut stop_rx => break,
            }
        }
        daemon.shutdown().unwrap();
    });
    (stop_tx, handle)
}

fn writer(config: &Config) -> Application<FileRecorder> {
    Application::new(
        &config.herald.application,
        Arc::new(FileRecorder::open(&config.journal_path).unwrap()),
    )
}

fn remote_counters(counters: &Arc<ProcessApplication<MemoryRecorder, Counters>>) -> System {
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
async fn remote_log_matches_the_writer() {
    let deployment = deployment();
    let config = &deployment.config;
    let dogs = writer(config);
    teach(&dogs, "Fido", &["sit", "stay", "beg", "heel"]);

    let (stop, served) = serve(startup(config).await.unwrap());
    let remote = RemoteNotificationLog::new(&config.socket_path);

    remote.ping().await.unwrap();
    let local = dogs.notification_log();
    for section_id in ["1,4", "5,8", "current"] {
        assert_eq!(
            remote.section(section_id).await.unwrap(),
            local.section(section_id).unwrap()
        );
    }
    let tricks = remote
        .select(1, 10, &["dog:trick_added".to_string()])
        .await
        .unwrap();
    assert_eq!(tricks.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 3, 4, 5]);

    stop.send(()).unwrap();
    served.await.unwrap();
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn follower_pulls_across_the_socket() {
    let deployment = deployment();
    let config = &deployment.config;
    let dogs = writer(config);
    teach(&dogs, "Fido", &["roll over"]);

    let (stop, served) = serve(startup(config).await.unwrap());

    let counters = Arc::new(ProcessApplication::new(
        &ApplicationConfig::named("counters"),
        Arc::new(MemoryRecorder::new()),
        Counters,
    ));
    let mut runner = MultiProcessRunner::new(remote_counters(&counters), fast_runner())
        .with_endpoint("dogs", &config.socket_path);
    runner.start().unwrap();
    assert!(eventually(|| count(&*counters, "roll over") == 1).await);

    // Commits made after the daemon started reach the follower too
    teach(&dogs, "Rex", &["roll over", "sit"]);
    teach(&dogs, "Spot", &["roll over"]);
    assert!(eventually(|| count(&*counters, "roll over") == 3 && count(&*counters, "sit") == 1).await);

    runner.stop().await.unwrap();
    assert_eq!(
        counters.position("dogs").unwrap(),
        dogs.recorder().max_notification_id().unwrap()
    );

    stop.send(()).unwrap();
    served.await.unwrap();
}

#[tokio::test]
async fn follower_rides_out_a_daemon_restart() {
    let deployment = deployment();
    let config = &deployment.config;
    let dogs = writer(config);
    teach(&dogs, "Fido", &["sit"]);

    let counters = Arc::new(ProcessApplication::new(
        &ApplicationConfig::named("counters"),
        Arc::new(MemoryRecorder::new()),
        Counters,
    ));
    let mut runner = MultiProcessRunner::new(remote_counters(&counters), fast_runner())
        .with_endpoint("dogs", &config.socket_path);
    runner.start().unwrap();

    let (stop, served) = serve(startup(config).await.unwrap());
    assert!(eventually(|| count(&*counters, "sit") == 1).await);
    stop.send(()).unwrap();
    served.await.unwrap();

    // The daemon is down; the writer carries on
    teach(&dogs, "Rex", &["sit"]);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(count(&*counters, "sit"), 1);

    let (stop, served) = serve(startup(config).await.unwrap());
    assert!(eventually(|| count(&*counters, "sit") == 2).await);
    runner.stop().await.unwrap();

    stop.send(()).unwrap();
    served.await.unwrap();
}
