// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod announce;
pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod irc;
pub mod metrics;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::announce::{AnnounceTemplate, Announcer};
pub use crate::config::BotSettings;
pub use crate::history::{HistoryStore, MatchMode};
pub use crate::ingest::{Announcement, Field, SourcePoller, SourceReader};
pub use crate::irc::{LineSender, Session, SessionState};
pub use crate::pipeline::AnnouncePipeline;
