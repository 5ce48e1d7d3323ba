use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on the first scrape).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("announce_polls_total", "Poll cycles started.");
        describe_counter!(
            "announce_new_items_total",
            "Items not yet in history, across all polls."
        );
        describe_counter!("announce_sent_total", "Announcement lines delivered.");
        describe_counter!(
            "announce_send_failures_total",
            "Announcements that could not be written to the link."
        );
        describe_counter!(
            "announce_source_errors_total",
            "Source fetch/parse errors."
        );
        describe_counter!("history_compactions_total", "History file truncations.");
        describe_counter!("history_io_errors_total", "History read/write failures.");
        describe_counter!("irc_reconnects_total", "Reconnect attempts scheduled.");
        describe_counter!("irc_pings_total", "Keepalive pings answered.");
        describe_histogram!("announce_parse_ms", "Source payload parse time in milliseconds.");
        describe_gauge!("announce_last_poll_ts", "Unix ts of the last poll cycle.");
    });
}

/// Install the Prometheus recorder with its own scrape listener.
/// Must run inside the tokio runtime.
pub fn install_exporter(listen: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .with_context(|| format!("installing prometheus exporter on {listen}"))?;
    ensure_described();
    tracing::info!(%listen, "metrics endpoint up");
    Ok(())
}
