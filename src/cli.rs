use crate::config::{DEFAULT_EPOCH_ADJUSTMENT, MAX_LISTENER_RECONNECT_TRIES};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "symbol-listener",
    about = "real-time chain event listener for symbol/nem2 nodes",
    version
)]
pub struct Args {
    /// Account address to monitor (plain or dash separated)
    #[arg(short, long)]
    pub address: String,

    /// Node REST endpoint URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    pub node: String,

    /// Maximum number of consecutive reconnection attempts
    #[arg(long, default_value_t = MAX_LISTENER_RECONNECT_TRIES)]
    pub max_reconnect_tries: u32,

    /// Reconnection delay in seconds
    #[arg(long, default_value = "5")]
    pub reconnect_delay: u64,

    /// Websocket connect and handshake timeout in seconds
    #[arg(long, default_value = "10")]
    pub handshake_timeout: u64,

    /// REST request timeout in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout: u64,

    /// Network epoch adjustment in seconds since the unix epoch
    #[arg(long, default_value_t = DEFAULT_EPOCH_ADJUSTMENT)]
    pub epoch_adjustment: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Output format: text, json, minimal
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,
}
