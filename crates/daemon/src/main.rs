// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Herald Daemon (heraldd)
//!
//! Serves one application's notification log over a Unix socket so that
//! followers in other processes can pull from it.
//!
//! Usage: `heraldd [PROJECT_ROOT]` (defaults to the current directory).

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use herald_daemon::lifecycle::{self, Config, DaemonState, LifecycleError};
use herald_daemon::server;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Line written to the log before tracing is up.
/// Full format: "--- heraldd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- heraldd: starting (pid: ";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let project_root = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => std::env::current_dir()?,
    };
    let config = Config::for_project(&project_root)?;

    append_to_log(
        &config,
        &format!("{STARTUP_MARKER_PREFIX}{}) ---", std::process::id()),
    )?;
    let guard = init_tracing(&config)?;
    info!(project = %config.project_root.display(), "starting heraldd");

    let daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            // The non-blocking writer may drop this on exit, so write it directly too
            let _ = append_to_log(&config, &format!("ERROR startup failed: {e}"));
            error!(error = %e, "startup failed");
            drop(guard);
            return Err(e.into());
        }
    };

    serve(daemon).await?;
    info!("heraldd exited");
    Ok(())
}

/// Accept followers until SIGTERM or SIGINT arrives.
async fn serve(mut daemon: DaemonState) -> Result<(), LifecycleError> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    info!(
        socket = %daemon.config.socket_path.display(),
        application = %daemon.config.herald.application.name,
        "accepting followers"
    );
    // A supervising process waits for this line
    println!("READY");

    let reason = loop {
        tokio::select! {
            accepted = daemon.listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let log = Arc::clone(&daemon.log);
                    tokio::spawn(async move {
                        if let Err(e) = server::handle_connection(log, stream).await {
                            warn!(error = %e, "follower connection failed");
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            },
            _ = terminate.recv() => break "SIGTERM",
            _ = interrupt.recv() => break "SIGINT",
        }
    };

    info!(signal = reason, "stopping");
    daemon.shutdown()
}

fn append_to_log(config: &Config, line: &str) -> Result<(), LifecycleError> {
    if let Some(dir) = config.log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

fn init_tracing(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = config.log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    let file = config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(guard)
}
