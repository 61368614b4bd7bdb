// file: src/connection.rs
// description: single websocket connection to a node, multiplexing every channel subscription
// reference: https://docs.symbol.dev/api.html#websockets

use crate::{
    address::Address,
    channel::{ChannelKind, ChannelSubscription},
    error::{ListenerError, Result},
    monitoring::{DUPLICATE_FRAMES_COUNTER, FRAMES_RECEIVED_COUNTER},
    types::{HandshakeMessage, SubscriptionRequest},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub type FrameSender = mpsc::UnboundedSender<Value>;
pub type FrameReceiver = mpsc::UnboundedReceiver<Value>;

/// Resolves with the reason the socket ended, unless `close()` ran first,
/// in which case the sender is dropped and the receiver yields an error.
pub type Disconnect = oneshot::Receiver<ListenerError>;

struct Route {
    address: Option<Address>,
    frames: FrameSender,
}

type RouteTable = Arc<Mutex<HashMap<ChannelKind, Route>>>;

fn lock_routes(routes: &RouteTable) -> MutexGuard<'_, HashMap<ChannelKind, Route>> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable access to an open connection's subscribe primitives.
#[derive(Clone)]
pub struct ConnectionHandle {
    uid: Arc<str>,
    outbound: mpsc::UnboundedSender<Message>,
    routes: RouteTable,
    open: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Registers where frames for `subscription` are delivered. Replaces any
    /// previous route for the same channel.
    pub fn route(&self, subscription: &ChannelSubscription) -> FrameReceiver {
        let (frames, receiver) = mpsc::unbounded_channel();
        lock_routes(&self.routes).insert(
            subscription.kind,
            Route {
                address: subscription.address.clone(),
                frames,
            },
        );
        receiver
    }

    pub fn subscribe(&self, subscription: &ChannelSubscription) -> Result<()> {
        self.send(SubscriptionRequest::subscribe(
            &self.uid,
            &subscription.to_string(),
        ))
    }

    pub fn unsubscribe(&self, subscription: &ChannelSubscription) -> Result<()> {
        lock_routes(&self.routes).remove(&subscription.kind);
        self.send(SubscriptionRequest::unsubscribe(
            &self.uid,
            &subscription.to_string(),
        ))
    }

    fn send(&self, request: SubscriptionRequest) -> Result<()> {
        if !self.is_open() {
            return Err(ListenerError::NotConnected);
        }
        let text = serde_json::to_string(&request)?;
        trace!("Queueing channel request: {}", text);
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| ListenerError::NotConnected)
    }
}

struct Link {
    handle: ConnectionHandle,
    reader: JoinHandle<()>,
}

/// Owns exactly one socket to a node's websocket endpoint.
pub struct ChannelConnection {
    url: String,
    handshake_timeout: Duration,
    link: Option<Link>,
}

impl ChannelConnection {
    pub fn new(url: impl Into<String>, handshake_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            handshake_timeout,
            link: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.handle.is_open())
    }

    pub fn uid(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.handle.uid())
    }

    pub fn handle(&self) -> Result<ConnectionHandle> {
        self.link
            .as_ref()
            .map(|link| link.handle.clone())
            .ok_or(ListenerError::NotConnected)
    }

    /// Connects and waits for the server's `uid` handshake. Any previous
    /// socket held by this connection is closed first.
    pub async fn open(&mut self) -> Result<Disconnect> {
        self.close();

        debug!("Connecting to {}", self.url);
        let (ws_stream, _) = timeout(self.handshake_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ListenerError::Timeout)??;

        let (write, mut read) = ws_stream.split();

        let uid = timeout(self.handshake_timeout, read_handshake(&mut read))
            .await
            .map_err(|_| ListenerError::Timeout)??;

        info!(url = %self.url, uid = %uid, "Channel connection established");

        let routes = RouteTable::default();
        let open = Arc::new(AtomicBool::new(true));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (disconnect_tx, disconnect_rx) = oneshot::channel();

        tokio::spawn(write_frames(write, outbound_rx));
        let reader = tokio::spawn(read_frames(
            read,
            routes.clone(),
            open.clone(),
            disconnect_tx,
        ));

        self.link = Some(Link {
            handle: ConnectionHandle {
                uid: Arc::from(uid.as_str()),
                outbound,
                routes,
                open,
            },
            reader,
        });

        Ok(disconnect_rx)
    }

    /// Closes the socket. Returns `false` when there was nothing to close.
    pub fn close(&mut self) -> bool {
        let Some(link) = self.link.take() else {
            return false;
        };

        link.handle.open.store(false, Ordering::Release);
        link.reader.abort();
        // dropping the routes ends every topic stream
        lock_routes(&link.handle.routes).clear();
        let _ = link.handle.outbound.send(Message::Close(None));

        info!(url = %self.url, "Channel connection closed");
        true
    }
}

impl Drop for ChannelConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_handshake(read: &mut SplitStream<WsStream>) -> Result<String> {
    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                let handshake: HandshakeMessage =
                    serde_json::from_str(text.as_str()).map_err(|e| {
                        ListenerError::HandshakeFailed {
                            reason: format!("unexpected first frame: {}", e),
                        }
                    })?;
                return Ok(handshake.uid);
            }
            Message::Close(frame) => {
                return Err(ListenerError::HandshakeFailed {
                    reason: format!("closed before handshake: {:?}", frame),
                });
            }
            _ => continue,
        }
    }

    Err(ListenerError::HandshakeFailed {
        reason: "stream ended before handshake".to_string(),
    })
}

async fn write_frames(
    mut write: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = write.send(message).await {
            debug!("Socket write failed: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
}

async fn read_frames(
    mut read: SplitStream<WsStream>,
    routes: RouteTable,
    open: Arc<AtomicBool>,
    disconnect: oneshot::Sender<ListenerError>,
) {
    let mut previous: Option<Value> = None;

    let reason = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                FRAMES_RECEIVED_COUNTER.increment(1);
                trace!("Received text frame: {}", text.as_str());

                let frame: Value = match serde_json::from_str(text.as_str()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Dropping non-JSON frame: {}", e);
                        continue;
                    }
                };

                if previous.as_ref() == Some(&frame) {
                    DUPLICATE_FRAMES_COUNTER.increment(1);
                    debug!("Dropping duplicate frame");
                    continue;
                }

                route_frame(&routes, &frame);
                previous = Some(frame);
            }
            Some(Ok(Message::Binary(data))) => {
                debug!("Ignoring binary frame of {} bytes", data.len());
            }
            Some(Ok(Message::Close(frame))) => {
                warn!("Received close frame: {:?}", frame);
                break ListenerError::ConnectionClosed;
            }
            // ping/pong are answered by tungstenite
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket stream error: {}", e);
                break ListenerError::WebSocketError(e);
            }
            None => break ListenerError::ConnectionClosed,
        }
    };

    open.store(false, Ordering::Release);
    lock_routes(&routes).clear();
    let _ = disconnect.send(reason);
}

fn route_frame(routes: &RouteTable, frame: &Value) {
    let Some((kind, topic_address, payload)) = classify(frame) else {
        debug!("Frame matches no known channel");
        return;
    };

    let routes = lock_routes(routes);
    let Some(route) = routes.get(&kind) else {
        trace!(channel = %kind, "No listener for channel");
        return;
    };

    if let (Some(expected), Some(actual)) = (&route.address, topic_address)
        && !expected.matches(actual)
    {
        debug!(channel = %kind, address = actual, "Dropping frame for another address");
        return;
    }

    let _ = route.frames.send(payload.clone());
}

/// Works out which channel a frame belongs to.
///
/// Newer nodes wrap payloads as `{"topic": "...", "data": {...}}`; older ones
/// send the bare payload, identified by its shape.
pub(crate) fn classify(frame: &Value) -> Option<(ChannelKind, Option<&str>, &Value)> {
    if let (Some(topic), Some(data)) = (frame.get("topic").and_then(Value::as_str), frame.get("data"))
    {
        let (kind, address) = ChannelSubscription::split_topic(topic)?;
        return Some((kind, address, data));
    }

    let kind = if frame.get("block").is_some() {
        ChannelKind::Block
    } else if frame.get("status").is_some() {
        ChannelKind::Status
    } else if frame.get("parentHash").is_some() {
        ChannelKind::Cosignature
    } else {
        frame
            .pointer("/meta/channelName")
            .and_then(Value::as_str)?
            .parse()
            .ok()?
    };

    Some((kind, None, frame))
}
