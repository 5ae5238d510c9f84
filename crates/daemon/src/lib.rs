// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herald-daemon: serves one application's notification log
//!
//! The daemon tails the application's journal read-only and answers
//! `Ping`, `Section` and `Select` requests on a Unix socket, so followers in
//! other processes can pull from it with `RemoteNotificationLog`.

pub mod lifecycle;
pub mod server;

pub use lifecycle::{startup, Config, DaemonState, LifecycleError};
pub use server::{handle_connection, handle_request, ServerError};
