use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::title_key;
use crate::ingest::types::{Announcement, Field, SourceReader};

#[derive(Debug, Deserialize)]
struct TorrentPage {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Debug, Deserialize)]
struct Datum {
    #[serde(default)]
    id: Option<IdValue>,
    #[serde(default)]
    attributes: Attributes,
}

// Trackers disagree on whether ids are strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(s) => s.trim().to_string(),
            IdValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i == 1,
            Flag::Text(s) => s.trim() == "1" || s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Attributes {
    name: Option<String>,
    category: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    resolution: Option<String>,
    size: Option<f64>,
    freeleech: Option<String>,
    double_upload: Option<Flag>,
    uploader: Option<String>,
    download_link: Option<String>,
    details_link: Option<String>,
}

pub struct TorrentApiReader {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        token: String,
        client: reqwest::Client,
    },
}

impl TorrentApiReader {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(base_url: &str, token: &str, client: reqwest::Client) -> Self {
        let url = format!("{}/api/torrents", base_url.trim_end_matches('/'));
        Self {
            mode: Mode::Http {
                url,
                token: token.to_string(),
                client,
            },
        }
    }

    fn to_announcement(d: Datum) -> Option<Announcement> {
        let a = d.attributes;
        let id = d
            .id
            .map(IdValue::into_string)
            .filter(|s| !s.is_empty())
            .or_else(|| a.name.as_deref().map(title_key))
            .filter(|s| !s.is_empty())?;

        let double = if a.double_upload.as_ref().is_some_and(Flag::is_set) {
            "Yes"
        } else {
            "No"
        };
        let url = a
            .details_link
            .clone()
            .or_else(|| a.download_link.as_deref().map(details_from_download))
            .unwrap_or_default();

        Some(
            Announcement::new(id)
                .with(Field::Category, a.category.unwrap_or_default())
                .with(Field::Type, a.kind.unwrap_or_default())
                .with(Field::Resolution, a.resolution.unwrap_or_default())
                .with(Field::Name, a.name.unwrap_or_default())
                .with(Field::Uploader, a.uploader.unwrap_or_default())
                .with(Field::Url, url)
                .with(Field::Size, a.size.map(|s| format_bytes(s as u64)).unwrap_or_default())
                .with(Field::Freeleech, a.freeleech.unwrap_or_default())
                .with(Field::DoubleUpload, double),
        )
    }
}

#[async_trait]
impl SourceReader for TorrentApiReader {
    async fn fetch_body(&self) -> Result<String, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, token, client } => {
                let resp = client
                    .get(url)
                    .query(&[("api_token", token)])
                    .send()
                    .await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(SourceError::Status(status.as_u16()));
                }
                Ok(resp.text().await?)
            }
        }
    }

    fn parse(&self, body: &str) -> Result<Vec<Announcement>, SourceError> {
        let page: TorrentPage = serde_json::from_str(body)?;
        Ok(page
            .data
            .into_iter()
            .filter_map(Self::to_announcement)
            .collect())
    }

    fn name(&self) -> &str {
        "torrent-api"
    }
}

/// `https://t/torrent/download/123.<rsskey>` → `https://t/torrents/download/123`
fn details_from_download(link: &str) -> String {
    let trimmed = match link.rsplit_once('.') {
        Some((head, tail)) if !tail.contains('/') && tail.len() >= 16 => head,
        _ => link,
    };
    trimmed.replacen("/torrent/", "/torrents/", 1)
}

/// Human readable size with base-1024 suffixes and at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const SUFFIX: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut i = 0;
    while value >= 1024.0 && i < SUFFIX.len() - 1 {
        value /= 1024.0;
        i += 1;
    }
    let mut num = format!("{value:.2}");
    if num.contains('.') {
        num = num.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{num} {}", SUFFIX[i])
}
