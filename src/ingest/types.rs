// src/ingest/types.rs
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SourceError;

/// Named display fields an upstream item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Category,
    Type,
    Resolution,
    Name,
    Uploader,
    Url,
    Size,
    Freeleech,
    DoubleUpload,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Category,
        Field::Type,
        Field::Resolution,
        Field::Name,
        Field::Uploader,
        Field::Url,
        Field::Size,
        Field::Freeleech,
        Field::DoubleUpload,
    ];

    /// Placeholder key used in announce templates.
    pub fn key(self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Type => "type",
            Field::Resolution => "resolution",
            Field::Name => "name",
            Field::Uploader => "uploader",
            Field::Url => "url",
            Field::Size => "size",
            Field::Freeleech => "freeleech",
            Field::DoubleUpload => "double_upload",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.key() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One normalized upstream item. Built once per poll cycle, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    id: String,
    fields: BTreeMap<Field, String>,
}

impl Announcement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a display field; empty values are dropped.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.fields.insert(field, value);
        }
        self
    }

    /// Identifier used for de-duplication: native upstream id or normalized title.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Upstream collaborator. `fetch_body` does the transport, `parse` the schema,
/// so a poller can short-circuit on an unchanged raw body.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn fetch_body(&self) -> Result<String, SourceError>;
    fn parse(&self, body: &str) -> Result<Vec<Announcement>, SourceError>;
    fn name(&self) -> &str;

    async fn fetch_new(&self) -> Result<Vec<Announcement>, SourceError> {
        let body = self.fetch_body().await?;
        self.parse(&body)
    }
}
