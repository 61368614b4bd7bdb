use crate::error::ListenerError;
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static FRAMES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("symbol_listener_frames_received_total"));
pub static DUPLICATE_FRAMES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("symbol_listener_duplicate_frames_total"));
pub static EVENTS_DISPATCHED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("symbol_listener_events_dispatched_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("symbol_listener_reconnects_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> =
    LazyLock::new(|| gauge!("symbol_listener_connected"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "symbol-listener")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            FRAMES_RECEIVED_COUNTER.absolute(0);
            DUPLICATE_FRAMES_COUNTER.absolute(0);
            EVENTS_DISPATCHED_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(ListenerError::MetricsError(e.to_string()).into())
        }
    }
}
