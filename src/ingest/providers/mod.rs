pub mod torrent_api;
pub mod torrent_rss;

use std::time::Duration;

use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::ingest::poller::{PollStrategy, SourcePoller};
use crate::ingest::types::SourceReader;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Shared HTTP client for all readers.
pub fn http_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("announce-bot/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Build the poller matching the configured source kind.
pub fn poller_from_settings(source: &SourceSettings) -> Result<SourcePoller, SourceError> {
    let client = http_client()?;
    let poller = match source {
        SourceSettings::Api {
            base_url,
            api_token,
        } => {
            let reader = torrent_api::TorrentApiReader::from_url(base_url, api_token, client);
            SourcePoller::new(PollStrategy::ApiSnapshot, vec![Box::new(reader)])
        }
        SourceSettings::Feeds { feeds } => {
            let readers = feeds
                .iter()
                .map(|f| {
                    Box::new(torrent_rss::TorrentRssReader::from_url(
                        &f.url,
                        f.freeleech,
                        client.clone(),
                    )) as Box<dyn SourceReader>
                })
                .collect();
            SourcePoller::new(PollStrategy::Feeds, readers)
        }
    };
    Ok(poller)
}
