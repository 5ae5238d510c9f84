// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file) is a valid configuration:
//!
//! ```toml
//! [application]
//! name = "dog-school"
//! section_size = 10
//!
//! [runner]
//! poll_interval = "100ms"
//! pull_timeout = "5s"
//!
//! [bigarray]
//! array_size = 10000
//! ```

use crate::notification::{
    DEFAULT_ARRAY_SIZE, DEFAULT_HOLE_HORIZON, DEFAULT_MAX_APPEND_ATTEMPTS, DEFAULT_SECTION_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub application: ApplicationConfig,
    pub runner: RunnerConfig,
    pub bigarray: BigArrayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    /// Notifications per log section
    pub section_size: u64,
    /// Snapshot every this many aggregate versions
    pub snapshot_interval: Option<u64>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "application".to_string(),
            section_size: DEFAULT_SECTION_SIZE,
            snapshot_interval: None,
        }
    }
}

impl ApplicationConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Notifications pulled per batch
    pub batch_size: usize,
    /// Idle wait between polls when no prompt arrives
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Timeout for one pull from a remote log
    #[serde(with = "humantime_serde")]
    pub pull_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_initial: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
    /// Policy re-runs allowed after version conflicts
    pub max_commit_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(100),
            pull_timeout: Duration::from_secs(5),
            backoff_initial: Duration::from_millis(100),
            backoff_max: Duration::from_secs(5),
            max_commit_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigArrayConfig {
    pub array_size: u64,
    pub max_append_attempts: u32,
    /// Filled positions after a hole before readers skip it
    pub hole_horizon: u64,
}

impl Default for BigArrayConfig {
    fn default() -> Self {
        Self {
            array_size: DEFAULT_ARRAY_SIZE,
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
            hole_horizon: DEFAULT_HOLE_HORIZON,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application.name.is_empty() {
            return Err(ConfigError::Invalid("application.name is empty".into()));
        }
        if self.application.section_size == 0 {
            return Err(ConfigError::Invalid("application.section_size must be positive".into()));
        }
        if self.application.snapshot_interval == Some(0) {
            return Err(ConfigError::Invalid("application.snapshot_interval must be positive".into()));
        }
        if self.runner.batch_size == 0 {
            return Err(ConfigError::Invalid("runner.batch_size must be positive".into()));
        }
        if self.runner.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid("runner.max_commit_attempts must be positive".into()));
        }
        if self.runner.backoff_initial > self.runner.backoff_max {
            return Err(ConfigError::Invalid("runner.backoff_initial exceeds backoff_max".into()));
        }
        if self.bigarray.array_size < 2 {
            return Err(ConfigError::Invalid("bigarray.array_size must be at least 2".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
