// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bringing a daemon up for one application and tearing it down again.
//!
//! Each (project, application) pair owns a socket, a PID lock, a version
//! file and a log, all named by a hash of the two.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use herald_core::{LocalNotificationLog, NotificationLog, TracedRecorder};
use herald_storage::{JournalView, StorageError};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Project-level configuration file
pub const CONFIG_FILE: &str = "herald.toml";

/// Where a daemon keeps its files, plus the project's settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical project directory
    pub project_root: PathBuf,
    /// Socket followers connect to
    pub socket_path: PathBuf,
    /// Holds the PID while a daemon runs
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    /// Journal written by the application whose log is served
    pub journal_path: PathBuf,
    /// Settings from `herald.toml`
    pub herald: herald_core::Config,
}

impl Config {
    /// Resolve paths under the user's state and socket directories
    pub fn for_project(project_root: &Path) -> Result<Self, LifecycleError> {
        Self::with_dirs(project_root, &state_dir()?, &socket_dir()?)
    }

    /// Resolve paths under the given directories
    pub fn with_dirs(
        project_root: &Path,
        state_dir: &Path,
        socket_dir: &Path,
    ) -> Result<Self, LifecycleError> {
        let canonical = project_root
            .canonicalize()
            .map_err(|e| LifecycleError::ProjectNotFound(project_root.to_path_buf(), e))?;
        let herald = herald_core::Config::load(&canonical.join(CONFIG_FILE))?;

        // One daemon per application within a project
        let name = &herald.application.name;
        let hash = project_hash(&canonical, name);
        let state_dir = state_dir.join("projects").join(&hash);

        Ok(Self {
            socket_path: socket_dir.join(format!("{hash}.sock")),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            journal_path: canonical.join(".herald").join(format!("{name}.jsonl")),
            project_root: canonical,
            herald,
        })
    }
}

/// A running daemon
pub struct DaemonState {
    pub config: Config,
    // The exclusive lock lasts as long as this handle
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    /// Read-only view of the application's journal
    pub journal: Arc<TracedRecorder<JournalView>>,
    /// Sections and selects over the view
    pub log: Arc<dyn NotificationLog>,
    pub start_time: Instant,
}

impl DaemonState {
    /// Remove the socket, PID and version files. The lock itself is
    /// released when the state is dropped.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!(application = %self.config.herald.application.name, "daemon stopping");

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "could not remove daemon file");
                }
            }
        }

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "daemon stopped");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no project at {0}: {1}")]
    ProjectNotFound(PathBuf, std::io::Error),

    #[error("neither XDG_STATE_HOME nor HOME is set")]
    NoStateDir,

    #[error("another daemon holds the lock for this application")]
    LockFailed(#[source] std::io::Error),

    #[error("cannot listen on {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error(transparent)]
    Config(#[from] herald_core::ConfigError),

    #[error("journal: {0}")]
    Journal(#[from] StorageError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Lock, record the PID, open the journal view and bind the socket.
///
/// Files are only cleaned up on failures after the lock is held, so a
/// refused second daemon leaves the running one untouched.
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    for dir in [config.lock_path.parent(), config.socket_path.parent()]
        .into_iter()
        .flatten()
    {
        std::fs::create_dir_all(dir)?;
    }
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;

    let started = start_locked(config, lock_file).await;
    if started.is_err() {
        remove_daemon_files(config);
    }
    started
}

async fn start_locked(config: &Config, mut lock_file: File) -> Result<DaemonState, LifecycleError> {
    use std::io::Write;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // Followers may connect as soon as the socket exists
    let journal = Arc::new(TracedRecorder::new(JournalView::open(&config.journal_path)?));
    let log: Arc<dyn NotificationLog> = Arc::new(LocalNotificationLog::new(
        Arc::clone(&journal),
        config.herald.application.section_size,
    ));
    if !config.journal_path.exists() {
        warn!(journal = %config.journal_path.display(), "journal does not exist yet, serving an empty log");
    }

    // Left behind by a daemon that did not shut down
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(
        project = %config.project_root.display(),
        application = %config.herald.application.name,
        journal = %config.journal_path.display(),
        "daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        journal,
        log,
        start_time: Instant::now(),
    })
}

fn remove_daemon_files(config: &Config) {
    for path in [
        &config.socket_path,
        &config.version_path,
        &config.lock_path,
    ] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// `$XDG_STATE_HOME/herald`, else `~/.local/state/herald`
fn state_dir() -> Result<PathBuf, LifecycleError> {
    match std::env::var_os("XDG_STATE_HOME") {
        Some(xdg) => Ok(PathBuf::from(xdg).join("herald")),
        None => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/state/herald"))
            .ok_or(LifecycleError::NoStateDir),
    }
}

/// `$HERALD_SOCKET_DIR`, else `/tmp/herald`. Socket paths must stay
/// under the platform's `sun_path` limit.
fn socket_dir() -> Result<PathBuf, LifecycleError> {
    Ok(std::env::var_os("HERALD_SOCKET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp/herald")))
}

/// Hash of project path and application name, naming the daemon's files
fn project_hash(path: &Path, application: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update([0]);
    hasher.update(application.as_bytes());
    hasher.finalize()[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
