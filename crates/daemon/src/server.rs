// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One request per connection, answered from the served notification log.

use std::sync::Arc;

use herald_core::NotificationLog;
use herald_engine::remote::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};
use tokio::net::UnixStream;
use tracing::{debug, warn};

/// Read a request, answer it and close.
///
/// A follower that hangs up before asking anything is not an error.
pub async fn handle_connection(
    log: Arc<dyn NotificationLog>,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut rx, mut tx) = stream.into_split();

    let request = match protocol::read_request(&mut rx, DEFAULT_TIMEOUT).await {
        Ok(request) => request,
        Err(ProtocolError::ConnectionClosed) => {
            debug!("follower hung up without a request");
            return Ok(());
        }
        Err(ProtocolError::Timeout) => {
            warn!(timeout = ?DEFAULT_TIMEOUT, "follower sent nothing in time");
            return Err(ServerError::Timeout);
        }
        Err(e) => return Err(e.into()),
    };

    debug!(?request, "answering");
    let response = handle_request(log, request).await;
    protocol::write_response(&mut tx, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Answer one request from the log
///
/// Log reads touch the journal, so they run on a blocking thread.
pub async fn handle_request(log: Arc<dyn NotificationLog>, request: Request) -> Response {
    let answer = tokio::task::spawn_blocking(move || match request {
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
            Ok(items) => {
                debug!(start, returned = items.len(), "selected notifications");
                Response::Notifications { items }
            }
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
    })
    .await;

    match answer {
        Ok(response) => response,
        Err(e) => Response::Error {
            message: format!("request task failed: {e}"),
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("no request arrived before the timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
