// src/irc/sender.rs
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::error::TransportError;
use crate::irc::machine::SessionState;
use crate::irc::message::Command;
use crate::irc::transport::LineWriter;

pub(crate) type WriterSlot = Arc<Mutex<Option<Box<dyn LineWriter>>>>;

/// Cloneable handle for writing to the current connection.
///
/// The session swaps the writer in on connect and out on teardown; sends in
/// between fail with [`TransportError::NotConnected`]. Sending never waits on
/// the read side.
#[derive(Clone)]
pub struct LineSender {
    slot: WriterSlot,
    state: watch::Receiver<SessionState>,
}

impl LineSender {
    pub(crate) fn new(slot: WriterSlot, state: watch::Receiver<SessionState>) -> Self {
        Self { slot, state }
    }

    /// Sender bound to a fixed writer and state, for driving components
    /// without a session.
    pub fn with_writer(writer: Box<dyn LineWriter>, state: SessionState) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self {
            slot: Arc::new(Mutex::new(Some(writer))),
            state: rx,
        }
    }

    /// Send one protocol line. CR/LF inside `line` are flattened so it stays
    /// exactly one line on the wire.
    pub async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let line = line.replace(['\r', '\n'], " ");
        let mut guard = self.slot.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_line(&line).await
    }

    pub async fn send(&self, cmd: &Command) -> Result<(), TransportError> {
        tracing::info!(target: "irc", out = %cmd.redacted(), ">>");
        self.send_line(&cmd.to_string()).await
    }

    /// Like [`send`](Self::send), but refuses with
    /// [`TransportError::NotConnected`] unless the session is `Active`. The
    /// state is read under the writer lock, so a writer installed by a later,
    /// still unregistered connection is never used.
    pub async fn send_when_active(&self, cmd: &Command) -> Result<(), TransportError> {
        let line = cmd.to_string().replace(['\r', '\n'], " ");
        let mut guard = self.slot.lock().await;
        let state = self.state();
        if state != SessionState::Active {
            tracing::debug!(target: "irc", ?state, "session not active; line held back");
            return Err(TransportError::NotConnected);
        }
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        tracing::info!(target: "irc", out = %cmd.redacted(), ">>");
        writer.write_line(&line).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }
}
