// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming task watcher.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use flame_core::{FlameError, Task};
use flame_wire::{FrontendResponse, ProtocolError};

use crate::connection::unexpected;

/// Iterator over ordered task snapshots from a `WatchTask` stream.
///
/// The stream ends once a terminal snapshot has been delivered; connection
/// loss before that surfaces as an `internal` error. There is no timeout
/// between snapshots — tasks take as long as they take.
pub struct TaskWatcher {
    reader: OwnedReadHalf,
    // Held so the frontend keeps the stream open; dropping the watcher
    // closes the connection and abandons the watch.
    _writer: OwnedWriteHalf,
    terminal_seen: bool,
}

impl TaskWatcher {
    pub(crate) fn new(reader: OwnedReadHalf, writer: OwnedWriteHalf) -> Self {
        Self { reader, _writer: writer, terminal_seen: false }
    }

    /// Next snapshot, or `None` once the terminal snapshot was returned.
    pub async fn next(&mut self) -> Result<Option<Task>, FlameError> {
        if self.terminal_seen {
            return Ok(None);
        }

        match flame_wire::read_message(&mut self.reader).await {
            Ok(bytes) => {
                let response: FrontendResponse =
                    flame_wire::decode(&bytes).map_err(FlameError::from)?;
                match response {
                    FrontendResponse::Task { task } => {
                        let task: Task = task.into();
                        if task.is_terminal() {
                            self.terminal_seen = true;
                        }
                        Ok(Some(task))
                    }
                    FrontendResponse::Error { code, message } => {
                        Err(FlameError::new(code, message))
                    }
                    other => Err(unexpected(other)),
                }
            }
            Err(ProtocolError::ConnectionClosed) => {
                Err(FlameError::internal("watch stream closed before terminal state"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
