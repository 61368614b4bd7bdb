use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use symbol_listener::{
    ListenerCoordinator, ListenerStatus, NetworkManager,
    cli::Args,
    config::Config,
    formatter::TransactionFormatter,
    monitoring::setup_metrics,
    network::HttpRepositoryFactory,
    sink::{Collaborators, EndpointHealth, EnglishTranslator},
    tracing_setup::setup_tracing,
    ui::TerminalReporter,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_args(&args)?;

    setup_tracing(&config.logging)?;

    info!("Starting symbol-listener v{}", env!("CARGO_PKG_VERSION"));

    // ring backs both wss:// and https:// endpoints
    let _ = rustls::crypto::ring::default_provider().install_default();

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let reporter = Arc::new(TerminalReporter::new(
        config.output.format.clone(),
        config.output.colored,
    ));
    let formatter = Arc::new(TransactionFormatter::new(
        reporter.clone(),
        config.network.epoch_adjustment,
    ));

    let collaborators = Collaborators {
        state: reporter.clone(),
        notifier: reporter.clone(),
        translator: Arc::new(EnglishTranslator),
        transactions: formatter,
    };

    let listeners = ListenerCoordinator::new(config.listener.clone(), collaborators);
    let factory = Arc::new(HttpRepositoryFactory::new(config.network.request_timeout)?);
    let network = NetworkManager::new(factory, listeners.clone(), reporter);

    network.switch_address(config.wallet.address.clone()).await;

    let health = network.switch_endpoint(config.network.node.as_str()).await;
    if health != EndpointHealth::Healthy {
        error!("Node {} is not reachable", config.network.node);
        anyhow::bail!("node {} is not reachable", config.network.node);
    }

    info!(
        "Listening for {}. Press Ctrl+C to shutdown...",
        config.wallet.address.pretty()
    );

    let mut status = listeners.watch_status();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
        _ = status.wait_for(|status| *status == ListenerStatus::Failed) => {
            error!("Listener gave up reconnecting");
        }
    }

    network.shutdown().await;
    info!("Listener stopped successfully");
    Ok(())
}
