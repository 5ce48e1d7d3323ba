//! Announce bot binary entrypoint.
//! Loads config, wires the session, poller and announcer, and runs until
//! Ctrl-C or until the reconnect budget is spent.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use announce_bot::announce::Announcer;
use announce_bot::config::BotSettings;
use announce_bot::history::HistoryStore;
use announce_bot::ingest::providers::poller_from_settings;
use announce_bot::ingest::scheduler::{poll_channel, PollTimer};
use announce_bot::irc::{Command, Session, TcpConnector};
use announce_bot::pipeline::AnnouncePipeline;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// `LOG_FORMAT=json` switches to JSON lines; filter via `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("announce_bot=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Arc::new(BotSettings::load_default()?);
    tracing::info!(
        nick = %settings.irc.nick,
        server = %settings.server_addr(),
        channels = ?settings.irc.channels,
        "announce bot starting"
    );

    if let Some(listen) = settings.metrics.listen {
        announce_bot::metrics::install_exporter(listen)?;
    }

    let h = &settings.history;
    let history = HistoryStore::open(&h.path, h.lookback, h.match_mode)
        .await
        .context("opening announce history")?;
    let poller = poller_from_settings(&settings.source).context("building source reader")?;

    let (tx, rx) = poll_channel();
    let timer = PollTimer::new(settings.poll.interval(), tx);
    let mut session = Session::new(settings.clone(), TcpConnector::from_settings(&settings), timer);

    let announcer = Announcer::from_settings(session.sender(), &settings)?;
    let pipeline = AnnouncePipeline::new(poller, announcer, history);
    let worker = tokio::spawn(pipeline.run(rx, session.sender()));
    let control = session.sender();

    let outcome = tokio::select! {
        res = session.run() => res.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            if let Err(e) = control.send(&Command::Quit("shutting down".into())).await {
                tracing::debug!(error = %e, "quit not delivered");
            }
            Ok(())
        }
    };

    // Dropping the session disarms the timer and closes the request channel;
    // the worker finishes its in-flight cycle and exits.
    drop(session);
    if tokio::time::timeout(SHUTDOWN_GRACE, worker).await.is_err() {
        tracing::warn!("poll pipeline did not stop in time; abandoning it");
    }

    outcome
}
