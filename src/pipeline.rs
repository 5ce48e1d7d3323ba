// src/pipeline.rs
//! Poll → announce cycles, run on one task that exclusively owns the
//! history store. The poll timer only posts requests here, so cycles never
//! overlap.

use tokio::sync::mpsc;

use crate::announce::Announcer;
use crate::history::HistoryStore;
use crate::ingest::poller::SourcePoller;
use crate::ingest::scheduler::PollRequest;
use crate::irc::sender::LineSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub new_items: usize,
    pub announced: usize,
    pub unsent: usize,
}

pub struct AnnouncePipeline {
    poller: SourcePoller,
    announcer: Announcer,
    history: HistoryStore,
}

impl AnnouncePipeline {
    pub fn new(poller: SourcePoller, announcer: Announcer, history: HistoryStore) -> Self {
        Self {
            poller,
            announcer,
            history,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Poll once and relay whatever is new.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let items = self.poller.poll(&self.history).await;
        if items.is_empty() {
            return CycleReport::default();
        }

        let outcome = self.announcer.announce_all(&items, &self.history).await;
        if outcome.interrupted() {
            // Unchanged listings are skipped; make sure the leftovers are re-read.
            self.poller.forget_snapshots();
        }
        CycleReport {
            new_items: items.len(),
            announced: outcome.announced,
            unsent: outcome.unsent,
        }
    }

    /// Serve poll requests until the timer side of the channel is gone.
    /// Requests arriving while the session is not active are skipped.
    pub async fn run(mut self, mut requests: mpsc::Receiver<PollRequest>, session: LineSender) {
        while let Some(req) = requests.recv().await {
            if !session.is_active() {
                tracing::debug!(seq = req.seq, state = ?session.state(), "session not active; poll skipped");
                continue;
            }
            let report = self.run_cycle().await;
            if report.new_items > 0 {
                tracing::info!(
                    seq = req.seq,
                    new = report.new_items,
                    announced = report.announced,
                    unsent = report.unsent,
                    "poll cycle done"
                );
            } else {
                tracing::debug!(seq = req.seq, "poll cycle: nothing new");
            }
        }
        tracing::info!("poll pipeline stopped");
    }
}
