/// file: src/config.rs
/// description: configuration sections built from command-line arguments
use crate::{address::Address, cli::Args, endpoint::Endpoint, ui::OutputFormat};
use anyhow::Result;
use std::time::Duration;

/// Consecutive reconnection attempts before the listener gives up.
pub const MAX_LISTENER_RECONNECT_TRIES: u32 = 20;

/// Symbol mainnet network epoch, in seconds since the unix epoch.
pub const DEFAULT_EPOCH_ADJUSTMENT: i64 = 1_615_853_185;

#[derive(Debug, Clone)]
pub struct Config {
    pub listener: ListenerConfig,
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub max_reconnect_tries: u32,
    pub reconnect_delay: Duration,
    pub handshake_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_reconnect_tries: MAX_LISTENER_RECONNECT_TRIES,
            reconnect_delay: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub node: Endpoint,
    pub request_timeout: Duration,
    pub epoch_adjustment: i64,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let node = Endpoint::parse(&args.node)?;
        let address = Address::parse(&args.address)?;

        Ok(Config {
            listener: ListenerConfig {
                max_reconnect_tries: args.max_reconnect_tries,
                reconnect_delay: Duration::from_secs(args.reconnect_delay),
                handshake_timeout: Duration::from_secs(args.handshake_timeout),
            },
            network: NetworkConfig {
                node,
                request_timeout: Duration::from_secs(args.request_timeout),
                epoch_adjustment: args.epoch_adjustment,
            },
            wallet: WalletConfig { address },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            logging: LoggingConfig {
                level: args.log_level.clone(),
                json: args.json_logs,
            },
            output: OutputConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
            },
        })
    }
}
