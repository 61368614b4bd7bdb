//! Shared fixtures: a mock node websocket server and recording collaborators.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use symbol_listener::config::ListenerConfig;
use symbol_listener::sink::{
    Collaborators, EnglishTranslator, FormatOptions, Notifier, Severity, StateCommit, StateSink,
    TransactionHandler,
};
use symbol_listener::types::Transaction;
use symbol_listener::{Address, ListenerCoordinator, ListenerStatus};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

pub const ADDRESS_A: &str = "SBILTA367K2LX2FEXG5TFWAS7GEFYAGY7QLFBYKC";
pub const ADDRESS_B: &str = "SCVG35ZSPMYP4U2VKMNVQKQZKUZPDSCUAKTDZCBM";

pub const WAIT: Duration = Duration::from_secs(5);

pub fn address(raw: &str) -> Address {
    Address::parse(raw).expect("valid address")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Handshake, record requests, push frames on command.
    Serve,
    /// Send the uid, then close straight away.
    CloseAfterHandshake,
    /// Send a first frame that is not a handshake.
    NoHandshake,
}

#[derive(Debug, Clone)]
enum Command {
    Push(String),
    Disconnect,
}

pub struct MockNode {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
    commands: broadcast::Sender<Command>,
}

impl MockNode {
    pub async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let connections = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (commands, _) = broadcast::channel(64);

        let node = Self {
            addr,
            connections: connections.clone(),
            closes: closes.clone(),
            requests: requests.clone(),
            commands: commands.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    stream,
                    behavior,
                    commands.subscribe(),
                    requests.clone(),
                    closes.clone(),
                ));
            }
        });

        node
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn socket_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|request| request["subscribe"].as_str().map(str::to_string))
            .collect()
    }

    pub fn push(&self, frame: Value) {
        let _ = self.commands.send(Command::Push(frame.to_string()));
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }
}

async fn serve(
    stream: TcpStream,
    behavior: Behavior,
    mut commands: broadcast::Receiver<Command>,
    requests: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    let first = match behavior {
        Behavior::NoHandshake => json!({"hello": "world"}),
        _ => json!({"uid": uuid::Uuid::new_v4().to_string()}),
    };
    if ws.send(Message::Text(first.to_string().into())).await.is_err() {
        return;
    }

    if behavior == Behavior::CloseAfterHandshake {
        let _ = ws.close(None).await;
        return;
    }

    loop {
        tokio::select! {
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(request) = serde_json::from_str::<Value>(text.as_str()) {
                        requests.lock().unwrap().push(request);
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    closes.fetch_add(1, Ordering::SeqCst);
                    return;
                }
                Some(Ok(_)) => {}
                _ => return,
            },
            command = commands.recv() => match command {
                Ok(Command::Push(text)) => {
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                Ok(Command::Disconnect) => {
                    let _ = ws.close(None).await;
                    return;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(_) => return,
            },
        }
    }
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out waiting")
}

pub async fn wait_for_status(coordinator: &ListenerCoordinator, expected: ListenerStatus) {
    let mut status = coordinator.watch_status();
    within(status.wait_for(|status| *status == expected))
        .await
        .expect("status channel closed");
}

#[derive(Default)]
pub struct Recorder {
    commits: Mutex<Vec<StateCommit>>,
    notifications: Mutex<Vec<(String, Severity)>>,
    transactions: Mutex<Vec<(Transaction, FormatOptions)>>,
}

impl Recorder {
    pub fn commits(&self) -> Vec<StateCommit> {
        self.commits.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, Severity)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn transactions(&self) -> Vec<(Transaction, FormatOptions)> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            state: self.clone(),
            notifier: self.clone(),
            translator: Arc::new(EnglishTranslator),
            transactions: self.clone(),
        }
    }
}

impl StateSink for Recorder {
    fn commit(&self, commit: StateCommit) {
        self.commits.lock().unwrap().push(commit);
    }
}

impl Notifier for Recorder {
    fn trigger(&self, message: &str, severity: Severity) {
        self.notifications
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}

impl TransactionHandler for Recorder {
    fn format_and_save_new_transaction(&self, transaction: &Transaction, options: FormatOptions) {
        self.transactions
            .lock()
            .unwrap()
            .push((transaction.clone(), options));
    }
}

pub fn listener_config(max_reconnect_tries: u32) -> ListenerConfig {
    ListenerConfig {
        max_reconnect_tries,
        reconnect_delay: Duration::ZERO,
        handshake_timeout: Duration::from_secs(2),
    }
}

pub fn transaction_frame(topic: &str, hash: Option<&str>) -> Value {
    let mut data = json!({
        "transaction": {
            "type": 16724,
            "signerPublicKey": "AB",
            "maxFee": "100",
            "deadline": "1000",
        }
    });
    if let Some(hash) = hash {
        data["meta"] = json!({"height": "0", "hash": hash});
    }
    json!({"topic": topic, "data": data})
}
