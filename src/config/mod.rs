// src/config/mod.rs
pub mod bot;

pub use bot::{
    AnnounceSection, BotSettings, FeedSettings, HistorySection, IrcSection, MetricsSection,
    PollSection, SourceSettings, DEFAULT_CONFIG_PATH, ENV_API_TOKEN, ENV_CONFIG_PATH,
    ENV_NICKSERV_PASSWORD,
};
