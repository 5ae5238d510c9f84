// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herald-engine: propagation between applications
//!
//! Process applications follow leaders' notification logs and commit their
//! reactions atomically with tracking rows. Runners drive a [`System`] of
//! applications in one thread, on tokio tasks, or across processes.

mod error;
mod process;
pub mod remote;
pub mod runner;
mod system;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use error::{PolicyError, ProcessError, RunnerError};
pub use process::{Policy, ProcessApplication, ProcessingEvent};
pub use remote::{BlockingRemoteLog, RemoteError, RemoteNotificationLog, UpstreamLog};
pub use runner::{MultiProcessRunner, MultiThreadedRunner, SingleThreadedRunner};
pub use system::{Edge, Follower, Leader, Node, System, SystemError};
