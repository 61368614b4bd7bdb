mod support;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use support::{ADDRESS_A, ADDRESS_B, Behavior, MockNode, Recorder, address, listener_config, wait_for_status};
use symbol_listener::network::{
    ChainRepository, HttpRepositoryFactory, NetworkManager, RepositoryFactory,
};
use symbol_listener::sink::{EndpointHealth, StateCommit};
use symbol_listener::types::{BlockInfo, NetworkName};
use symbol_listener::{Endpoint, ListenerCoordinator, ListenerError, ListenerStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct MockRepository {
    generation_hash: Option<String>,
    height: u64,
}

#[async_trait]
impl ChainRepository for MockRepository {
    async fn genesis_block(&self) -> symbol_listener::error::Result<BlockInfo> {
        Ok(BlockInfo {
            height: 1,
            timestamp: Some(0),
            hash: Some("GENESIS".to_string()),
            generation_hash: self.generation_hash.clone(),
            signer_public_key: None,
        })
    }

    async fn chain_height(&self) -> symbol_listener::error::Result<u64> {
        Ok(self.height)
    }

    async fn network_name(&self) -> symbol_listener::error::Result<NetworkName> {
        Err(ListenerError::Timeout)
    }
}

struct UnreachableRepository;

#[async_trait]
impl ChainRepository for UnreachableRepository {
    async fn genesis_block(&self) -> symbol_listener::error::Result<BlockInfo> {
        Err(ListenerError::Timeout)
    }

    async fn chain_height(&self) -> symbol_listener::error::Result<u64> {
        Err(ListenerError::Timeout)
    }

    async fn network_name(&self) -> symbol_listener::error::Result<NetworkName> {
        Err(ListenerError::Timeout)
    }
}

/// Serves a known repository per endpoint; anything else is unreachable.
#[derive(Default)]
struct MockFactory {
    repositories: HashMap<String, Arc<MockRepository>>,
}

impl MockFactory {
    fn with(mut self, endpoint: &str, generation_hash: &str, height: u64) -> Self {
        self.repositories.insert(
            endpoint.to_string(),
            Arc::new(MockRepository {
                generation_hash: Some(generation_hash.to_string()),
                height,
            }),
        );
        self
    }
}

impl RepositoryFactory for MockFactory {
    fn create(&self, endpoint: &Endpoint) -> symbol_listener::error::Result<Arc<dyn ChainRepository>> {
        Ok(match self.repositories.get(endpoint.as_str()) {
            Some(repository) => repository.clone(),
            None => Arc::new(UnreachableRepository),
        })
    }
}

fn manager(factory: MockFactory, recorder: &Arc<Recorder>) -> NetworkManager {
    let listeners = ListenerCoordinator::new(listener_config(2), recorder.collaborators());
    NetworkManager::new(Arc::new(factory), listeners, recorder.clone())
}

fn health_commits(recorder: &Recorder) -> Vec<EndpointHealth> {
    recorder
        .commits()
        .into_iter()
        .filter_map(|commit| match commit {
            StateCommit::EndpointStatus { health, .. } => Some(health),
            _ => None,
        })
        .collect()
}

fn generation_changes(recorder: &Recorder) -> Vec<(Option<String>, String)> {
    recorder
        .commits()
        .into_iter()
        .filter_map(|commit| match commit {
            StateCommit::GenerationHashChanged { previous, current } => Some((previous, current)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_unreachable_endpoint_is_unhealthy() {
    let recorder = Arc::new(Recorder::default());
    let network = manager(MockFactory::default(), &recorder);
    network.switch_address(address(ADDRESS_A)).await;

    let health = network.switch_endpoint("http://node.invalid:3000").await;

    assert_eq!(health, EndpointHealth::Unhealthy);
    assert_eq!(network.health().await, Some(EndpointHealth::Unhealthy));
    assert!(network.endpoint().await.is_none());
    assert_eq!(network.listeners().status(), ListenerStatus::Idle);
    assert!(network.listeners().endpoint().await.is_none());
    assert_eq!(
        recorder.commits(),
        vec![
            StateCommit::EndpointStatus {
                endpoint: "http://node.invalid:3000".to_string(),
                health: EndpointHealth::Loading,
            },
            StateCommit::ResetNetworkProperties,
            StateCommit::EndpointStatus {
                endpoint: "http://node.invalid:3000".to_string(),
                health: EndpointHealth::Unhealthy,
            },
        ]
    );
}

#[tokio::test]
async fn test_malformed_endpoint_is_unhealthy() {
    let recorder = Arc::new(Recorder::default());
    let network = manager(MockFactory::default(), &recorder);

    assert_eq!(
        network.switch_endpoint("ftp://node.example").await,
        EndpointHealth::Unhealthy
    );
    assert_eq!(
        network.switch_endpoint("not a url").await,
        EndpointHealth::Unhealthy
    );
    assert_eq!(
        health_commits(&recorder),
        vec![
            EndpointHealth::Loading,
            EndpointHealth::Unhealthy,
            EndpointHealth::Loading,
            EndpointHealth::Unhealthy,
        ]
    );
}

#[tokio::test]
async fn test_healthy_endpoint_starts_listeners() {
    let node = MockNode::start(Behavior::Serve).await;
    let recorder = Arc::new(Recorder::default());
    let network = manager(MockFactory::default().with(&node.endpoint(), "GEN1", 42), &recorder);
    network.switch_address(address(ADDRESS_A)).await;

    let health = network.switch_endpoint(&node.endpoint()).await;
    assert_eq!(health, EndpointHealth::Healthy);
    wait_for_status(network.listeners(), ListenerStatus::Active).await;

    assert_eq!(
        network.listeners().endpoint().await.map(|e| e.to_string()),
        Some(node.endpoint())
    );
    assert_eq!(network.generation_hash().await.as_deref(), Some("GEN1"));
    assert_eq!(
        health_commits(&recorder),
        vec![EndpointHealth::Loading, EndpointHealth::Healthy]
    );
    assert!(recorder.commits().iter().any(|commit| matches!(
        commit,
        StateCommit::NetworkProperties(properties)
            if properties.height == 42 && properties.network_name.is_none()
    )));
    assert_eq!(
        generation_changes(&recorder),
        vec![(None, "GEN1".to_string())]
    );

    assert!(network.shutdown().await);
    assert_eq!(network.listeners().status(), ListenerStatus::Idle);
}

#[tokio::test]
async fn test_generation_hash_change_is_committed_once() {
    let first = MockNode::start(Behavior::Serve).await;
    let same_network = MockNode::start(Behavior::Serve).await;
    let other_network = MockNode::start(Behavior::Serve).await;

    let recorder = Arc::new(Recorder::default());
    let factory = MockFactory::default()
        .with(&first.endpoint(), "GEN1", 10)
        .with(&same_network.endpoint(), "GEN1", 11)
        .with(&other_network.endpoint(), "GEN2", 5);
    let network = manager(factory, &recorder);
    network.switch_address(address(ADDRESS_A)).await;

    network.switch_endpoint(&first.endpoint()).await;
    network.switch_endpoint(&same_network.endpoint()).await;
    assert_eq!(generation_changes(&recorder).len(), 1);

    network.switch_endpoint(&other_network.endpoint()).await;
    assert_eq!(
        generation_changes(&recorder),
        vec![
            (None, "GEN1".to_string()),
            (Some("GEN1".to_string()), "GEN2".to_string()),
        ]
    );

    wait_for_status(network.listeners(), ListenerStatus::Active).await;
    assert_eq!(other_network.connections(), 1);

    network.shutdown().await;
}

#[tokio::test]
async fn test_failed_switch_keeps_generation_hash_and_stops_listeners() {
    let node = MockNode::start(Behavior::Serve).await;
    let recorder = Arc::new(Recorder::default());
    let network = manager(MockFactory::default().with(&node.endpoint(), "GEN1", 1), &recorder);
    network.switch_address(address(ADDRESS_A)).await;

    network.switch_endpoint(&node.endpoint()).await;
    wait_for_status(network.listeners(), ListenerStatus::Active).await;

    let health = network.switch_endpoint("http://node.invalid:3000").await;
    assert_eq!(health, EndpointHealth::Unhealthy);
    assert_eq!(network.listeners().status(), ListenerStatus::Idle);
    assert_eq!(network.generation_hash().await.as_deref(), Some("GEN1"));
    assert!(network.listeners().endpoint().await.is_none());
    assert!(support::wait_until(|| node.closes() == 1).await);

    // the old node must not be reused behind an unhealthy endpoint
    network.switch_address(address(ADDRESS_B)).await;
    network.listeners().start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(network.listeners().status(), ListenerStatus::Idle);
    assert_eq!(node.connections(), 1);
}

async fn serve_rest(routes: HashMap<&'static str, Value>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buffer).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buffer[..n]),
                }
            }

            let request = String::from_utf8_lossy(&request);
            let path = request.split_whitespace().nth(1).unwrap_or("/");
            let response = match routes.get(path) {
                Some(body) => {
                    let body = body.to_string();
                    format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                }
                None => {
                    "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                        .to_string()
                }
            };
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    addr
}

#[tokio::test]
async fn test_http_repository_reads_node_rest_api() {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let addr = serve_rest(HashMap::from([
        (
            "/block/1",
            json!({
                "block": {"height": "1", "timestamp": "0", "signerPublicKey": "AB"},
                "meta": {"hash": "GENESIS", "generationHash": "GEN1"}
            }),
        ),
        ("/chain/height", json!({"height": [7, 0]})),
        ("/network", json!({"name": "testnet", "description": "test network"})),
    ]))
    .await;

    let factory = HttpRepositoryFactory::new(Duration::from_secs(2)).unwrap();
    let repository = factory
        .create(&Endpoint::parse(&format!("http://{}", addr)).unwrap())
        .unwrap();

    let genesis = repository.genesis_block().await.unwrap();
    assert_eq!(genesis.generation_hash.as_deref(), Some("GEN1"));
    assert_eq!(repository.chain_height().await.unwrap(), 7);
    assert_eq!(repository.network_name().await.unwrap().name, "testnet");
}

#[tokio::test]
async fn test_http_repository_reports_missing_resources() {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let addr = serve_rest(HashMap::new()).await;
    let factory = HttpRepositoryFactory::new(Duration::from_secs(2)).unwrap();
    let repository = factory
        .create(&Endpoint::parse(&format!("http://{}", addr)).unwrap())
        .unwrap();

    assert!(matches!(
        repository.genesis_block().await,
        Err(ListenerError::HttpError(_))
    ));
}
