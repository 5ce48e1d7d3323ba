// src/announce/template.rs
use crate::error::TemplateError;
use crate::ingest::types::{Announcement, Field};

pub const DEFAULT_TEMPLATE: &str = "Category [{category}] Type [{type}] Name [{name}] \
Resolution [{resolution}] Freeleech [{freeleech}] Double Upload [{double_upload}] \
Size [{size}] Uploader [{uploader}] Url [{url}]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Parsed announce line template. `{field}` placeholders, `{{`/`}}` escapes.
/// Missing fields render as empty text, so one item always renders the same line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceTemplate {
    segments: Vec<Segment>,
}

impl AnnounceTemplate {
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;
        let mut offset = 0usize;

        while let Some(pos) = rest.find(['{', '}']) {
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                literal.push_str(&tail[..1]);
                rest = &tail[2..];
                offset += pos + 2;
                continue;
            }
            if tail.starts_with('}') {
                // Lone closing brace is kept literally.
                literal.push('}');
                rest = &tail[1..];
                offset += pos + 1;
                continue;
            }

            let end = tail
                .find('}')
                .ok_or(TemplateError::Unterminated(offset + pos))?;
            let key = tail[1..end].trim();
            let field = key
                .parse::<Field>()
                .map_err(TemplateError::UnknownField)?;
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field(field));
            rest = &tail[end + 1..];
            offset += pos + end + 1;
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, item: &Announcement) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(f) => out.push_str(item.field(*f).unwrap_or_default()),
            }
        }
        out
    }
}

impl Default for AnnounceTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE).unwrap_or(Self { segments: Vec::new() })
    }
}
