// src/irc/transport.rs
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::config::BotSettings;
use crate::error::TransportError;

/// Protocol line terminator appended to every outbound line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Longest inbound line kept, terminator included. Anything longer is
/// discarded up to its newline and surfaced as an empty line.
pub const MAX_LINE_BYTES: usize = 8192;

/// Read half of a line-oriented link.
#[async_trait]
pub trait LineReader: Send {
    /// Next line without its terminator; `Ok(None)` once the peer closed.
    async fn next_line(&mut self) -> Result<Option<String>, TransportError>;
}

/// Write half of a line-oriented link.
#[async_trait]
pub trait LineWriter: Send {
    /// Write `line` plus terminator and flush before returning.
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError>;
}

pub struct Connection {
    pub reader: Box<dyn LineReader>,
    pub writer: Box<dyn LineWriter>,
}

/// Opens fresh connections for the session on every (re)connect.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;
    fn describe(&self) -> String;
}

pub struct TcpConnector {
    addr: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn from_settings(cfg: &BotSettings) -> Self {
        Self::new(cfg.server_addr(), cfg.irc.connect_timeout())
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await
        {
            Ok(Ok(s)) => s,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    addr: self.addr.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    addr: self.addr.clone(),
                    after: self.timeout,
                })
            }
        };
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        Ok(Connection {
            reader: Box::new(TcpLineReader {
                inner: BufReader::new(read),
                buf: Vec::with_capacity(512),
            }),
            writer: Box::new(TcpLineWriter { inner: write }),
        })
    }

    fn describe(&self) -> String {
        self.addr.clone()
    }
}

struct TcpLineReader {
    inner: BufReader<OwnedReadHalf>,
    buf: Vec<u8>,
}

impl TcpLineReader {
    /// Skip buffered bytes up to and including the next newline (or EOF)
    /// without holding them.
    async fn discard_rest_of_line(&mut self) -> std::io::Result<usize> {
        let mut dropped = 0;
        loop {
            let chunk = self.inner.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(dropped);
            }
            match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    self.inner.consume(i + 1);
                    return Ok(dropped + i + 1);
                }
                None => {
                    let len = chunk.len();
                    self.inner.consume(len);
                    dropped += len;
                }
            }
        }
    }
}

#[async_trait]
impl LineReader for TcpLineReader {
    async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();
        let n = (&mut self.inner)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if n == MAX_LINE_BYTES && self.buf.last() != Some(&b'\n') {
            let dropped = n + self.discard_rest_of_line().await?;
            tracing::warn!(target: "irc", bytes = dropped, "overlong inbound line dropped");
            return Ok(Some(String::new()));
        }
        // Servers relay whatever bytes users send; do not fail on bad UTF-8.
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

struct TcpLineWriter {
    inner: OwnedWriteHalf,
}

#[async_trait]
impl LineWriter for TcpLineWriter {
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut framed = String::with_capacity(line.len() + LINE_TERMINATOR.len());
        framed.push_str(line);
        framed.push_str(LINE_TERMINATOR);
        self.inner.write_all(framed.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
