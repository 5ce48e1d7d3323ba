// tests/common/mod.rs
#![allow(dead_code)]

use announce_bot::config::BotSettings;
use announce_bot::error::{SourceError, TransportError};
use announce_bot::ingest::{Announcement, Field, SourceReader};
use announce_bot::irc::{Connection, Connector, LineReader, LineWriter};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_CONFIG: &str = r##"
[irc]
server = "irc.example.net"
nick = "announceBot"
channels = ["#announce", "#lobby"]
announce_channel = "#announce"
nickserv_password = "sekrit"
max_retries = 2
reconnect_delay_secs = 5

[source]
kind = "api"
base_url = "https://tracker.example"
api_token = "token"
"##;

pub fn settings() -> Arc<BotSettings> {
    Arc::new(BotSettings::from_toml_str(BASE_CONFIG).unwrap())
}

pub fn settings_with(irc_overrides: &[(&str, &str)]) -> Arc<BotSettings> {
    let mut s = BASE_CONFIG.to_string();
    for (k, v) in irc_overrides {
        let prefix = format!("{k} = ");
        let line = s
            .lines()
            .find(|l| l.starts_with(&prefix))
            .map(str::to_string);
        match line {
            Some(old) => s = s.replace(&old, &format!("{k} = {v}")),
            None => s = s.replace("[irc]\n", &format!("[irc]\n{k} = {v}\n")),
        }
    }
    Arc::new(BotSettings::from_toml_str(&s).unwrap())
}

// ---------- transport doubles ----------

pub type Written = Arc<Mutex<Vec<String>>>;

pub struct RecordingWriter {
    pub lines: Written,
    pub fail: bool,
}

#[async_trait]
impl LineWriter for RecordingWriter {
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )));
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

pub fn recording_writer() -> (Box<dyn LineWriter>, Written) {
    let lines: Written = Arc::new(Mutex::new(Vec::new()));
    (
        Box::new(RecordingWriter {
            lines: lines.clone(),
            fail: false,
        }),
        lines,
    )
}

pub fn failing_writer() -> Box<dyn LineWriter> {
    Box::new(RecordingWriter {
        lines: Arc::new(Mutex::new(Vec::new())),
        fail: true,
    })
}

struct ScriptedReader {
    lines: VecDeque<String>,
}

#[async_trait]
impl LineReader for ScriptedReader {
    async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.lines.pop_front())
    }
}

pub enum Script {
    Refuse,
    /// Serve these lines, then end the stream.
    Serve(Vec<&'static str>),
}

/// Hands out scripted connections in order; refuses once the script runs out.
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Script>>,
    pub attempts: Arc<AtomicUsize>,
    pub written: Written,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Serve(lines)) => Ok(Connection {
                reader: Box::new(ScriptedReader {
                    lines: lines.into_iter().map(str::to_string).collect(),
                }),
                writer: Box::new(RecordingWriter {
                    lines: self.written.clone(),
                    fail: false,
                }),
            }),
            Some(Script::Refuse) | None => Err(TransportError::Connect {
                addr: "scripted".into(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            }),
        }
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

// ---------- source doubles ----------

/// Body format: one `id|name` per line. `!` as a whole body parses as an error.
pub struct StubReader {
    bodies: Mutex<VecDeque<Result<String, ()>>>,
    pub fetches: Arc<AtomicUsize>,
    pub parses: Arc<AtomicUsize>,
}

impl StubReader {
    pub fn new(bodies: Vec<Result<&str, ()>>) -> Self {
        Self {
            bodies: Mutex::new(bodies.into_iter().map(|b| b.map(str::to_string)).collect()),
            fetches: Arc::new(AtomicUsize::new(0)),
            parses: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SourceReader for StubReader {
    async fn fetch_body(&self) -> Result<String, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.bodies.lock().unwrap().pop_front() {
            Some(Ok(b)) => Ok(b),
            _ => Err(SourceError::Status(503)),
        }
    }

    fn parse(&self, body: &str) -> Result<Vec<Announcement>, SourceError> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        if body == "!" {
            return Err(serde_json::from_str::<()>("!").unwrap_err().into());
        }
        Ok(body
            .lines()
            .filter_map(|l| l.split_once('|'))
            .map(|(id, name)| Announcement::new(id).with(Field::Name, name))
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub fn item(id: &str, name: &str) -> Announcement {
    Announcement::new(id).with(Field::Name, name)
}
