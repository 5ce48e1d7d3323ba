// src/error.rs
//! Error taxonomy shared by the session, the poller and the history store.
//!
//! Only `SessionError::RetriesExhausted` is ever fatal to the process; every
//! other variant is logged at the point where it happens and absorbed.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Connect/read/write failures on the chat link. Always recoverable by reconnecting.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {addr} timed out after {after:?}")]
    ConnectTimeout { addr: String, after: Duration },

    #[error("link i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server closed the stream")]
    Closed,

    #[error("server sent ERROR: {0}")]
    ServerError(String),

    #[error("not connected")]
    NotConnected,
}

/// Upstream read or payload failures. A poll cycle that hits one yields nothing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream answered with status {0}")]
    Status(u16),

    #[error("malformed json payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed feed xml: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// History file could not be read or written.
#[derive(Debug, Error)]
#[error("history {op} on {} failed: {source}", path.display())]
pub struct StoreError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StoreError {
    pub(crate) fn new(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownField(String),

    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("giving up after {attempts} consecutive connection failures (last: {last})")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
}
