// src/announce/announcer.rs
use anyhow::Context;
use metrics::counter;
use std::time::Duration;

use crate::announce::template::AnnounceTemplate;
use crate::config::BotSettings;
use crate::error::TransportError;
use crate::history::HistoryStore;
use crate::ingest::types::{Announcement, Field};
use crate::irc::message::Command;
use crate::irc::sender::LineSender;

/// Result of relaying one poll cycle's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub announced: usize,
    /// Items left unsent because the link failed mid-batch.
    pub unsent: usize,
}

impl BatchOutcome {
    pub fn interrupted(&self) -> bool {
        self.unsent > 0
    }
}

pub struct Announcer {
    sender: LineSender,
    channel: String,
    template: AnnounceTemplate,
    delay: Duration,
    high_water: usize,
    low_water: usize,
}

impl Announcer {
    pub fn new(sender: LineSender, channel: impl Into<String>, template: AnnounceTemplate) -> Self {
        Self {
            sender,
            channel: channel.into(),
            template,
            delay: Duration::ZERO,
            high_water: 100,
            low_water: 51,
        }
    }

    pub fn from_settings(sender: LineSender, cfg: &BotSettings) -> anyhow::Result<Self> {
        let template =
            AnnounceTemplate::parse(&cfg.announce.template).context("announce.template")?;
        Ok(Self::new(sender, cfg.irc.announce_channel.clone(), template)
            .with_delay(cfg.poll.announce_delay())
            .with_compaction(cfg.history.high_water, cfg.history.low_water))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_compaction(mut self, high_water: usize, low_water: usize) -> Self {
        self.high_water = high_water;
        self.low_water = low_water.min(high_water);
        self
    }

    pub fn render(&self, item: &Announcement) -> String {
        self.template.render(item)
    }

    /// Send one item, then record it. Nothing is sent unless the session is
    /// `Active`. The identifier is committed only after the line went out; a
    /// failed commit is logged and does not fail the send.
    pub async fn announce(
        &self,
        item: &Announcement,
        history: &HistoryStore,
    ) -> Result<(), TransportError> {
        let line = self.render(item);
        tracing::info!(
            id = item.id(),
            name = item.field(Field::Name).unwrap_or_default(),
            "announcing"
        );

        if let Err(e) = self
            .sender
            .send_when_active(&Command::Privmsg {
                target: self.channel.clone(),
                text: line,
            })
            .await
        {
            counter!("announce_send_failures_total").increment(1);
            tracing::warn!(error = %e, id = item.id(), "announce not delivered; not recorded");
            return Err(e);
        }
        counter!("announce_sent_total").increment(1);

        match history.append(item.id()).await {
            Ok(()) => {
                if let Err(e) = history.compact(self.high_water, self.low_water).await {
                    tracing::error!(error = %e, "history compaction failed");
                    counter!("history_io_errors_total").increment(1);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, id = item.id(), "announced but not recorded in history");
                counter!("history_io_errors_total").increment(1);
            }
        }
        Ok(())
    }

    /// Relay items in order with a blocking pause between consecutive sends.
    /// Stops at the first link failure or when the session leaves `Active`;
    /// the rest stay unrecorded for the next cycle.
    pub async fn announce_all(&self, items: &[Announcement], history: &HistoryStore) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (i, item) in items.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.announce(item, history).await.is_err() {
                outcome.unsent = items.len() - i;
                break;
            }
            outcome.announced += 1;
        }
        outcome
    }
}
