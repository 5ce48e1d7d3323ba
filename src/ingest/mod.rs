// src/ingest/mod.rs
pub mod poller;
pub mod providers;
pub mod scheduler;
pub mod types;

pub use poller::{PollStrategy, SourcePoller};
pub use scheduler::{PollRequest, PollTimer};
pub use types::{Announcement, Field, SourceReader};

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize upstream text: decode entities, strip tags, fold typographic
/// quotes, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));

    let decoded = html_escape::decode_html_entities(s);
    let untagged = re_tags.replace_all(&decoded, " ");
    let folded = untagged
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    re_ws.replace_all(&folded, " ").trim().to_string()
}

/// Surrogate identifier for items without a native id.
pub fn title_key(title: &str) -> String {
    normalize_text(title)
}
