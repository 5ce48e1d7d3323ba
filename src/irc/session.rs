// src/irc/session.rs
//! Session driver: owns the link, runs the read loop, reconnects with a
//! bounded budget and arms the poll timer once the handshake completes.

use metrics::counter;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::config::BotSettings;
use crate::error::{SessionError, TransportError};
use crate::ingest::scheduler::PollTimer;
use crate::irc::machine::{SessionMachine, SessionState};
use crate::irc::message::Command;
use crate::irc::sender::{LineSender, WriterSlot};
use crate::irc::transport::{Connection, Connector};

pub struct Session<C: Connector> {
    settings: Arc<BotSettings>,
    connector: C,
    machine: SessionMachine,
    slot: WriterSlot,
    state_tx: watch::Sender<SessionState>,
    timer: PollTimer,
}

impl<C: Connector> Session<C> {
    pub fn new(settings: Arc<BotSettings>, connector: C, timer: PollTimer) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            machine: SessionMachine::new(settings.clone()),
            settings,
            connector,
            slot: Arc::new(Mutex::new(None)),
            state_tx,
            timer,
        }
    }

    /// Handle for sending lines on whatever connection is current.
    pub fn sender(&self) -> LineSender {
        LineSender::new(self.slot.clone(), self.state_tx.subscribe())
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn timer(&self) -> &PollTimer {
        &self.timer
    }

    /// Keep the link up until the retry budget is spent. Only returns on
    /// fatal failure; callers stop it by dropping the future.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let max_retries = self.settings.irc.max_retries;
        let delay = self.settings.irc.reconnect_delay();
        let mut failures: u32 = 0;

        loop {
            self.machine.begin_connect();
            self.publish();
            tracing::info!(
                server = %self.connector.describe(),
                nick = %self.settings.irc.nick,
                "connecting"
            );

            let err = self.run_connection().await;
            if self.machine.activated() {
                failures = 0;
            }
            self.teardown().await;
            failures += 1;

            if failures > max_retries {
                self.machine.on_fatal();
                self.publish();
                tracing::error!(error = %err, failures, max_retries, "retry budget exhausted");
                return Err(SessionError::RetriesExhausted {
                    attempts: failures,
                    last: err,
                });
            }

            self.machine.on_link_lost();
            self.publish();
            counter!("irc_reconnects_total").increment(1);
            tracing::warn!(
                error = %err,
                failures,
                max_retries,
                retry_in_secs = delay.as_secs(),
                "link lost; reconnecting"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One connection's lifetime. Returns the error that ended it.
    async fn run_connection(&mut self) -> TransportError {
        let Connection { mut reader, writer } = match self.connector.connect().await {
            Ok(c) => c,
            Err(e) => return e,
        };
        *self.slot.lock().await = Some(writer);
        let sender = self.sender();

        let hello = self.machine.on_connected();
        self.publish();
        for cmd in &hello {
            if let Err(e) = sender.send(cmd).await {
                return e;
            }
        }

        loop {
            let line = match reader.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return TransportError::Closed,
                Err(e) => return e,
            };
            tracing::debug!(target: "irc", line = %line, "<<");

            let step = self.machine.on_line(&line);
            self.publish();

            for cmd in &step.outbound {
                if matches!(cmd, Command::Pong(_)) {
                    counter!("irc_pings_total").increment(1);
                }
                if let Err(e) = sender.send(cmd).await {
                    return e;
                }
            }
            if step.arm_poller {
                tracing::info!("handshake complete; announcements enabled");
                self.timer.arm();
            }
            if let Some(reason) = step.closed_by_server {
                return TransportError::ServerError(reason);
            }
        }
    }

    async fn teardown(&mut self) {
        self.timer.disarm();
        self.slot.lock().await.take();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.machine.state());
    }
}

