// src/ingest/scheduler.rs
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Signal posted by the timer onto the pipeline's execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub seq: u64,
}

/// Open a poll-request channel. Capacity one: while a cycle runs at most one
/// tick waits behind it, later ticks are dropped.
pub fn poll_channel() -> (mpsc::Sender<PollRequest>, mpsc::Receiver<PollRequest>) {
    mpsc::channel(1)
}

/// Repeating poll timer. Armed by the session when it becomes active,
/// disarmed when the connection is torn down. Dropping it disarms it.
pub struct PollTimer {
    interval: Duration,
    tx: mpsc::Sender<PollRequest>,
    task: Option<JoinHandle<()>>,
    arms: u32,
}

impl PollTimer {
    pub fn new(interval: Duration, tx: mpsc::Sender<PollRequest>) -> Self {
        Self {
            interval,
            tx,
            task: None,
            arms: 0,
        }
    }

    /// Start ticking. The first request is posted one interval from now.
    /// No-op while already armed.
    pub fn arm(&mut self) {
        if self.is_armed() {
            return;
        }
        self.arms += 1;
        let period = self.interval.max(Duration::from_millis(1));
        let tx = self.tx.clone();
        tracing::info!(interval_secs = period.as_secs(), "poll timer armed");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seq = 0u64;
            loop {
                ticker.tick().await;
                seq += 1;
                match tx.try_send(PollRequest { seq }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(seq, "previous poll still in flight; tick dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("poll pipeline gone; timer stopping");
                        break;
                    }
                }
            }
        }));
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("poll timer disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// How many times the timer has been armed over its lifetime.
    pub fn arm_count(&self) -> u32 {
        self.arms
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
