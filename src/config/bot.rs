// src/config/bot.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::announce::template::{AnnounceTemplate, DEFAULT_TEMPLATE};
use crate::history::MatchMode;

pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";
pub const ENV_CONFIG_PATH: &str = "ANNOUNCE_BOT_CONFIG";
pub const ENV_NICKSERV_PASSWORD: &str = "NICKSERV_PASSWORD";
pub const ENV_API_TOKEN: &str = "TRACKER_API_TOKEN";

/// Smallest lookback window the history membership test may use.
pub const MIN_LOOKBACK: usize = 500;

fn default_port() -> u16 {
    6667
}
fn default_max_retries() -> u32 {
    3
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_connect_timeout_secs() -> u64 {
    30
}
fn default_greeting() -> String {
    "Welcome {nick}".to_string()
}
fn default_interval_secs() -> u64 {
    60
}
fn default_announce_delay_secs() -> u64 {
    10
}
fn default_history_path() -> PathBuf {
    PathBuf::from("torrentHistory.log")
}
fn default_lookback() -> usize {
    MIN_LOOKBACK
}
fn default_high_water() -> usize {
    100
}
fn default_low_water() -> usize {
    51
}
fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

/// Immutable configuration snapshot. Loaded once, then shared behind an `Arc`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    pub irc: IrcSection,
    #[serde(default)]
    pub poll: PollSection,
    #[serde(default)]
    pub history: HistorySection,
    pub source: SourceSettings,
    #[serde(default)]
    pub announce: AnnounceSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IrcSection {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub nick: String,
    pub channels: Vec<String>,
    /// Channel new items are relayed to. Greetings are never sent here.
    pub announce_channel: String,
    /// `"ENV"` means: read from `NICKSERV_PASSWORD`. Empty skips identification.
    #[serde(default)]
    pub nickserv_password: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// `{nick}` is replaced by the joining user. Empty disables greetings.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Blocking pause between two consecutive announcements of one cycle.
    #[serde(default = "default_announce_delay_secs")]
    pub announce_delay_secs: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            announce_delay_secs: default_announce_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_high_water")]
    pub high_water: usize,
    #[serde(default = "default_low_water")]
    pub low_water: usize,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            lookback: default_lookback(),
            high_water: default_high_water(),
            low_water: default_low_water(),
            match_mode: MatchMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    /// Tracker JSON API, polled as one snapshot per tick.
    Api {
        base_url: String,
        /// `"ENV"` means: read from `TRACKER_API_TOKEN`.
        api_token: String,
    },
    /// One or more RSS feeds, each re-listing recent items every tick.
    Feeds { feeds: Vec<FeedSettings> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    pub url: String,
    #[serde(default)]
    pub freeleech: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnounceSection {
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for AnnounceSection {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSection {
    /// Address for the Prometheus scrape endpoint; disabled when absent.
    pub listen: Option<SocketAddr>,
}

impl BotSettings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("loading {}", path.display()))
    }

    /// Load using env var + fallback:
    /// 1) $ANNOUNCE_BOT_CONFIG
    /// 2) config/bot.toml
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from_file(&pb);
        }
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: BotSettings = toml::from_str(s).context("parsing bot config toml")?;
        cfg.resolve_secrets()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_secrets(&mut self) -> Result<()> {
        if is_env_marker(&self.irc.nickserv_password) {
            self.irc.nickserv_password = env::var(ENV_NICKSERV_PASSWORD)
                .map_err(|_| anyhow!("Missing {ENV_NICKSERV_PASSWORD} env var"))?;
        }
        if let SourceSettings::Api { api_token, .. } = &mut self.source {
            if is_env_marker(api_token) {
                *api_token = env::var(ENV_API_TOKEN)
                    .map_err(|_| anyhow!("Missing {ENV_API_TOKEN} env var"))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.irc.server.trim().is_empty() {
            bail!("irc.server must not be empty");
        }
        if self.irc.nick.trim().is_empty() || self.irc.nick.contains(' ') {
            bail!("irc.nick must be a single non-empty word");
        }
        if self.irc.channels.is_empty() {
            bail!("irc.channels must list at least one channel");
        }
        if self.irc.announce_channel.trim().is_empty() {
            bail!("irc.announce_channel must not be empty");
        }
        if self.poll.interval_secs == 0 {
            bail!("poll.interval_secs must be greater than zero");
        }
        if self.history.lookback < MIN_LOOKBACK {
            bail!(
                "history.lookback must be at least {MIN_LOOKBACK} (got {})",
                self.history.lookback
            );
        }
        if self.history.low_water > self.history.high_water {
            bail!(
                "history.low_water ({}) must not exceed history.high_water ({})",
                self.history.low_water,
                self.history.high_water
            );
        }
        match &self.source {
            SourceSettings::Api { base_url, .. } if base_url.trim().is_empty() => {
                bail!("source.base_url must not be empty")
            }
            SourceSettings::Feeds { feeds } if feeds.is_empty() => {
                bail!("source.feeds must list at least one feed")
            }
            _ => {}
        }
        AnnounceTemplate::parse(&self.announce.template).context("announce.template")?;
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.irc.server, self.irc.port)
    }
}

impl IrcSection {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

impl PollSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn announce_delay(&self) -> Duration {
        Duration::from_secs(self.announce_delay_secs)
    }
}

fn is_env_marker(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case("env")
}
