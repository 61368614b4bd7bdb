// file: src/network.rs
// description: resolves a node endpoint over REST and drives the listener coordinator
// reference: https://docs.symbol.dev/api.html

use crate::{
    address::Address,
    coordinator::ListenerCoordinator,
    endpoint::Endpoint,
    error::{ListenerError, Result},
    sink::{EndpointHealth, NetworkProperties, StateCommit, StateSink},
    types::{BlockFrame, BlockInfo, ChainHeight, NetworkName},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[async_trait]
pub trait ChainRepository: Send + Sync {
    async fn genesis_block(&self) -> Result<BlockInfo>;
    async fn chain_height(&self) -> Result<u64>;
    async fn network_name(&self) -> Result<NetworkName>;
}

pub trait RepositoryFactory: Send + Sync {
    fn create(&self, endpoint: &Endpoint) -> Result<Arc<dyn ChainRepository>>;
}

pub struct HttpRepositoryFactory {
    client: reqwest::Client,
}

impl HttpRepositoryFactory {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("symbol-listener/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl RepositoryFactory for HttpRepositoryFactory {
    fn create(&self, endpoint: &Endpoint) -> Result<Arc<dyn ChainRepository>> {
        Ok(Arc::new(HttpChainRepository {
            endpoint: endpoint.clone(),
            client: self.client.clone(),
        }))
    }
}

pub struct HttpChainRepository {
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl HttpChainRepository {
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint.rest_url(path)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ChainRepository for HttpChainRepository {
    async fn genesis_block(&self) -> Result<BlockInfo> {
        let frame: BlockFrame = self.get_json("block/1").await?;
        Ok(frame.into())
    }

    async fn chain_height(&self) -> Result<u64> {
        let height: ChainHeight = self.get_json("chain/height").await?;
        Ok(height.height)
    }

    async fn network_name(&self) -> Result<NetworkName> {
        self.get_json("network").await
    }
}

#[derive(Debug)]
struct NetworkState {
    endpoint: Option<Endpoint>,
    generation_hash: Option<String>,
    health: Option<EndpointHealth>,
}

/// Validates candidate endpoints and restarts the listeners on them.
pub struct NetworkManager {
    factory: Arc<dyn RepositoryFactory>,
    listeners: ListenerCoordinator,
    state: Arc<dyn StateSink>,
    current: Mutex<NetworkState>,
}

impl NetworkManager {
    pub fn new(
        factory: Arc<dyn RepositoryFactory>,
        listeners: ListenerCoordinator,
        state: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            factory,
            listeners,
            state,
            current: Mutex::new(NetworkState {
                endpoint: None,
                generation_hash: None,
                health: None,
            }),
        }
    }

    pub fn listeners(&self) -> &ListenerCoordinator {
        &self.listeners
    }

    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.current.lock().await.endpoint.clone()
    }

    pub async fn generation_hash(&self) -> Option<String> {
        self.current.lock().await.generation_hash.clone()
    }

    pub async fn health(&self) -> Option<EndpointHealth> {
        self.current.lock().await.health
    }

    /// Never fails: resolution errors are reflected in the returned health
    /// and committed to the state sink.
    pub async fn switch_endpoint(&self, candidate: &str) -> EndpointHealth {
        let mut current = self.current.lock().await;
        self.commit_health(&mut current, candidate, EndpointHealth::Loading);

        match self.resolve(candidate).await {
            Ok((endpoint, properties)) => {
                let previous = current.generation_hash.clone();
                let generation_hash = properties.generation_hash.clone();

                current.endpoint = Some(endpoint.clone());
                current.generation_hash = Some(generation_hash.clone());
                self.state.commit(StateCommit::NetworkProperties(properties));
                self.commit_health(&mut current, candidate, EndpointHealth::Healthy);

                if previous.as_deref() != Some(generation_hash.as_str()) {
                    info!(
                        previous = ?previous,
                        current = %generation_hash,
                        "Generation hash changed, wallets need re-sync"
                    );
                    self.state.commit(StateCommit::GenerationHashChanged {
                        previous,
                        current: generation_hash,
                    });
                }

                self.listeners.switch_endpoint(endpoint).await;
                EndpointHealth::Healthy
            }
            Err(e) => {
                warn!(endpoint = candidate, error = %e, "Endpoint unreachable");
                current.endpoint = None;
                self.listeners.clear_endpoint().await;
                self.state.commit(StateCommit::ResetNetworkProperties);
                self.commit_health(&mut current, candidate, EndpointHealth::Unhealthy);
                EndpointHealth::Unhealthy
            }
        }
    }

    pub async fn switch_address(&self, address: Address) {
        self.listeners.switch_address(address).await;
    }

    pub async fn shutdown(&self) -> bool {
        self.listeners.stop().await
    }

    fn commit_health(&self, current: &mut NetworkState, endpoint: &str, health: EndpointHealth) {
        current.health = Some(health);
        self.state.commit(StateCommit::EndpointStatus {
            endpoint: endpoint.to_string(),
            health,
        });
    }

    async fn resolve(&self, candidate: &str) -> Result<(Endpoint, NetworkProperties)> {
        let endpoint = Endpoint::parse(candidate)?;
        let repository = self.factory.create(&endpoint)?;

        let genesis = repository.genesis_block().await?;
        let generation_hash = genesis.generation_hash.ok_or_else(|| {
            ListenerError::InvalidMessage("genesis block carries no generation hash".to_string())
        })?;
        let height = repository.chain_height().await?;

        let network_name = match repository.network_name().await {
            Ok(network) => Some(network.name),
            Err(e) => {
                debug!(error = %e, "Network name unavailable");
                None
            }
        };

        let properties = NetworkProperties {
            endpoint: endpoint.to_string(),
            generation_hash,
            height,
            network_name,
        };
        Ok((endpoint, properties))
    }
}
