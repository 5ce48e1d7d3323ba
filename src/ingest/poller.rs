// src/ingest/poller.rs
//! Source Poller: fetch, filter against history, return new items in upstream order.

use metrics::{counter, gauge, histogram};
use std::collections::HashSet;

use crate::history::HistoryStore;
use crate::ingest::types::{Announcement, SourceReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStrategy {
    /// Whole-listing API: an unchanged raw body means nothing new.
    ApiSnapshot,
    /// Feeds re-list recent items every cycle; every item is checked.
    Feeds,
}

pub struct SourcePoller {
    readers: Vec<Box<dyn SourceReader>>,
    strategy: PollStrategy,
    /// Last successfully parsed body per reader (ApiSnapshot only).
    snapshots: Vec<Option<String>>,
}

impl SourcePoller {
    pub fn new(strategy: PollStrategy, readers: Vec<Box<dyn SourceReader>>) -> Self {
        let snapshots = vec![None; readers.len()];
        Self {
            readers,
            strategy,
            snapshots,
        }
    }

    pub fn strategy(&self) -> PollStrategy {
        self.strategy
    }

    /// Drop cached bodies so the next poll re-parses even an unchanged listing.
    pub fn forget_snapshots(&mut self) {
        self.snapshots.iter_mut().for_each(|s| *s = None);
    }

    /// One poll cycle. Reader failures are logged and contribute nothing.
    pub async fn poll(&mut self, history: &HistoryStore) -> Vec<Announcement> {
        counter!("announce_polls_total").increment(1);
        gauge!("announce_last_poll_ts").set(unix_now() as f64);

        let mut fresh = Vec::new();
        let mut seen_this_cycle: HashSet<String> = HashSet::new();

        for idx in 0..self.readers.len() {
            let Some(items) = self.read_one(idx).await else {
                continue;
            };
            for item in items {
                if item.id().trim().is_empty() {
                    tracing::debug!(reader = self.readers[idx].name(), "skipping item without identifier");
                    continue;
                }
                if !seen_this_cycle.insert(item.id().to_lowercase()) {
                    continue;
                }
                if history.contains(item.id()).await {
                    continue;
                }
                fresh.push(item);
            }
        }

        counter!("announce_new_items_total").increment(fresh.len() as u64);
        fresh
    }

    async fn read_one(&mut self, idx: usize) -> Option<Vec<Announcement>> {
        let reader = &self.readers[idx];
        let body = match reader.fetch_body().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, reader = reader.name(), "source read failed");
                counter!("announce_source_errors_total").increment(1);
                return None;
            }
        };

        if self.strategy == PollStrategy::ApiSnapshot
            && self.snapshots[idx].as_deref() == Some(body.as_str())
        {
            tracing::debug!(reader = reader.name(), "listing unchanged since last poll");
            return None;
        }

        let t0 = std::time::Instant::now();
        let parsed = reader.parse(&body);
        histogram!("announce_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match parsed {
            Ok(items) => {
                if self.strategy == PollStrategy::ApiSnapshot {
                    self.snapshots[idx] = Some(body);
                }
                Some(items)
            }
            Err(e) => {
                tracing::warn!(error = %e, reader = reader.name(), "source payload rejected");
                counter!("announce_source_errors_total").increment(1);
                None
            }
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
