use async_trait::async_trait;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::SourceError;
use crate::ingest::types::{Announcement, Field, SourceReader};
use crate::ingest::{normalize_text, title_key};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

pub struct TorrentRssReader {
    mode: Mode,
    freeleech: bool,
    label: String,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl TorrentRssReader {
    pub fn from_fixture_str(s: &str, freeleech: bool) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            freeleech,
            label: "fixture".to_string(),
        }
    }

    pub fn from_url(url: &str, freeleech: bool, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
            freeleech,
            label: redact_passkey(url),
        }
    }

    fn to_announcement(&self, it: Item) -> Option<Announcement> {
        let summary = it.description.as_deref().unwrap_or_default();
        let labels = summary_fields(summary);
        let get = |k: &str| labels.get(k).cloned().unwrap_or_default();

        let name = Some(get("name"))
            .filter(|n| !n.is_empty())
            .or_else(|| it.title.as_deref().map(normalize_text))
            .unwrap_or_default();
        let id = it
            .title
            .as_deref()
            .map(title_key)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_key(&name));
        if id.is_empty() {
            return None;
        }

        let freeleech = match labels.get("freeleech") {
            Some(v) if !v.is_empty() => v.clone(),
            _ if self.freeleech => "Yes".to_string(),
            _ => "No".to_string(),
        };

        Some(
            Announcement::new(id)
                .with(Field::Name, name)
                .with(Field::Category, get("category"))
                .with(Field::Type, get("type"))
                .with(Field::Resolution, get("resolution"))
                .with(Field::Size, get("size"))
                .with(Field::Uploader, uploader(summary))
                .with(Field::Url, it.link.unwrap_or_default().trim().to_string())
                .with(Field::Freeleech, freeleech),
        )
    }
}

#[async_trait]
impl SourceReader for TorrentRssReader {
    async fn fetch_body(&self) -> Result<String, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(SourceError::Status(status.as_u16()));
                }
                Ok(resp.text().await?)
            }
        }
    }

    fn parse(&self, body: &str) -> Result<Vec<Announcement>, SourceError> {
        let rss: Rss = from_str(&xml_safe(body))?;
        Ok(rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| self.to_announcement(it))
            .collect())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Collect `<strong>Label</strong>: value` pairs from an item summary,
/// keyed by lowercased label.
fn summary_fields(summary: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for segment in summary.split("<strong>").skip(1) {
        let Some((label, rest)) = segment.split_once("</strong>") else {
            continue;
        };
        let rest = rest.trim_start().trim_start_matches(':');
        let value = match rest.find("<br") {
            Some(end) => &rest[..end],
            None => rest,
        };
        let key = normalize_text(label).trim_end_matches(':').to_lowercase();
        if !key.is_empty() {
            out.insert(key, normalize_text(value));
        }
    }
    out
}

fn uploader(summary: &str) -> String {
    static RE_UPLOADER: OnceCell<Regex> = OnceCell::new();
    let re = RE_UPLOADER
        .get_or_init(|| Regex::new(r"(?i)Uploaded By\s+([^\s<]+)").expect("uploader regex"));
    if let Some(caps) = re.captures(summary) {
        return normalize_text(&caps[1]);
    }
    if summary.contains("Anonymous Uploader") {
        return "Anonymous".to_string();
    }
    String::new()
}

// Feed URLs carry the user's passkey; keep it out of logs.
fn redact_passkey(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((head, tail)) if tail.len() > 8 => format!("{head}/****"),
        _ => url.to_string(),
    }
}

// HTML entities that are not XML entities; the XML parser rejects them.
const HTML_ONLY_ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&ndash;", "-"),
    ("&mdash;", "-"),
    ("&ldquo;", "\""),
    ("&rdquo;", "\""),
    ("&lsquo;", "'"),
    ("&rsquo;", "'"),
];

fn xml_safe(body: &str) -> String {
    HTML_ONLY_ENTITIES
        .iter()
        .fold(body.to_string(), |acc, &(entity, plain)| acc.replace(entity, plain))
}
