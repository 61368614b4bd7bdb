// file: src/coordinator.rs
// description: keeps the channel listeners for one (endpoint, address) pair connected and fans
// decoded chain events out to the application collaborators

use crate::{
    address::Address,
    channel::ChannelKind,
    config::ListenerConfig,
    connection::{ChannelConnection, Disconnect},
    endpoint::Endpoint,
    error::{ListenerError, Result},
    events::{ChainEvent, EventReceiver, EventSender, create_event_channel},
    monitoring::{CONNECTED_GAUGE, EVENTS_DISPATCHED_COUNTER, RECONNECT_COUNTER},
    reconnect::{ReconnectState, RetryDecision},
    sink::{
        Collaborators, FormatOptions, Severity, StateCommit, TransactionStatusGroup, keys,
    },
    topic::{ChainEventStream, TopicListener},
    types::Transaction,
};
use futures_util::StreamExt;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStatus {
    Idle,
    Starting,
    Active,
    Retrying { attempt: u32 },
    Failed,
}

/// Owns the listeners for the current endpoint and address.
///
/// Cheap to clone; all clones drive the same state. Every stop/start pair
/// runs under one lock and each start is stamped with a generation number,
/// so a retry left over from an earlier session can never overwrite a
/// newer switch. Call [`ListenerCoordinator::stop`] to tear it down.
#[derive(Clone)]
pub struct ListenerCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: ListenerConfig,
    collaborators: Collaborators,
    session: Mutex<Session>,
    generation: AtomicU64,
    status: watch::Sender<ListenerStatus>,
}

struct Session {
    endpoint: Option<Endpoint>,
    address: Option<Address>,
    reconnect: ReconnectState,
    connection: Option<ChannelConnection>,
    supervisor: Option<JoinHandle<()>>,
}

enum SessionEnd {
    /// A stop or switch replaced this session.
    Superseded,
    Lost(ListenerError),
}

impl ListenerCoordinator {
    pub fn new(config: ListenerConfig, collaborators: Collaborators) -> Self {
        let (status, _) = watch::channel(ListenerStatus::Idle);
        let reconnect = ReconnectState::new(config.max_reconnect_tries);

        Self {
            inner: Arc::new(Inner {
                config,
                collaborators,
                session: Mutex::new(Session {
                    endpoint: None,
                    address: None,
                    reconnect,
                    connection: None,
                    supervisor: None,
                }),
                generation: AtomicU64::new(0),
                status,
            }),
        }
    }

    pub fn status(&self) -> ListenerStatus {
        *self.inner.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ListenerStatus> {
        self.inner.status.subscribe()
    }

    /// Reconnection attempts made since the last explicit switch.
    pub async fn retry_count(&self) -> u32 {
        self.inner.session.lock().await.reconnect.attempts()
    }

    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.inner.session.lock().await.endpoint.clone()
    }

    pub async fn address(&self) -> Option<Address> {
        self.inner.session.lock().await.address.clone()
    }

    pub async fn switch_endpoint(&self, endpoint: Endpoint) {
        let mut session = self.inner.session.lock().await;
        info!(endpoint = %endpoint, "Switching listener endpoint");

        session.endpoint = Some(endpoint);
        session.reconnect.reset();

        if session.address.is_some() {
            self.inner.stop_locked(&mut session);
            self.inner.start_locked(&mut session);
        }
    }

    pub async fn switch_address(&self, address: Address) {
        let mut session = self.inner.session.lock().await;
        info!(address = %address, "Switching listener address");

        session.address = Some(address);
        session.reconnect.reset();

        if session.endpoint.is_some() {
            self.inner.stop_locked(&mut session);
            self.inner.start_locked(&mut session);
        }
    }

    /// Stops the listeners and forgets the endpoint, so nothing restarts
    /// until a new endpoint is switched in. Returns whether a live
    /// connection was closed.
    pub async fn clear_endpoint(&self) -> bool {
        let mut session = self.inner.session.lock().await;
        let closed = self.inner.stop_locked(&mut session);
        if session.endpoint.take().is_some() {
            info!("Listener endpoint cleared");
        }
        closed
    }

    pub async fn start(&self) {
        let mut session = self.inner.session.lock().await;
        self.inner.start_locked(&mut session);
    }

    /// Closes the connection and detaches every listener. Returns whether a
    /// live connection was closed; safe to call in any state.
    pub async fn stop(&self) -> bool {
        let mut session = self.inner.session.lock().await;
        self.inner.stop_locked(&mut session)
    }
}

impl Inner {
    fn set_status(&self, status: ListenerStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(?previous, current = ?status, "Listener status changed");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn start_locked(self: &Arc<Self>, session: &mut Session) {
        let (Some(endpoint), Some(address)) = (session.endpoint.clone(), session.address.clone())
        else {
            debug!("Endpoint or address not set, listener stays idle");
            return;
        };

        if session
            .supervisor
            .as_ref()
            .is_some_and(|supervisor| !supervisor.is_finished())
        {
            debug!("Listener already running");
            return;
        }

        if session.reconnect.is_exhausted() {
            error!(
                max = session.reconnect.max_attempts(),
                "Listener reconnection budget exhausted, not starting"
            );
            self.set_status(ListenerStatus::Failed);
            return;
        }

        let generation = self.generation.load(Ordering::Acquire);
        self.set_status(ListenerStatus::Starting);

        let span = info_span!(
            "listener",
            endpoint = %endpoint,
            address = %address,
            generation
        );
        let inner = Arc::clone(self);
        session.supervisor = Some(tokio::spawn(
            async move {
                inner.supervise(generation, endpoint, address).await;
            }
            .instrument(span),
        ));
    }

    fn stop_locked(&self, session: &mut Session) -> bool {
        self.generation.fetch_add(1, Ordering::AcqRel);

        if let Some(supervisor) = session.supervisor.take() {
            supervisor.abort();
        }

        let closed = session
            .connection
            .take()
            .is_some_and(|mut connection| connection.close());

        CONNECTED_GAUGE.set(0.0);
        self.set_status(ListenerStatus::Idle);

        if closed {
            info!("Listener stopped");
        }
        closed
    }

    /// Connect, dispatch until the socket drops, then consult the retry
    /// budget. Runs until superseded or the budget is spent.
    async fn supervise(self: Arc<Self>, generation: u64, endpoint: Endpoint, address: Address) {
        loop {
            let reason = match self.connect_and_dispatch(generation, &endpoint, &address).await {
                SessionEnd::Superseded => return,
                SessionEnd::Lost(reason) => reason,
            };
            CONNECTED_GAUGE.set(0.0);

            let delay = {
                let mut session = self.session.lock().await;
                if !self.is_current(generation) {
                    return;
                }
                if let Some(mut connection) = session.connection.take() {
                    connection.close();
                }

                match session.reconnect.record_disconnect() {
                    RetryDecision::Retry { attempt } => {
                        warn!(
                            attempt,
                            max = self.config.max_reconnect_tries,
                            error = %reason,
                            "Listener connection lost, reconnecting"
                        );
                        RECONNECT_COUNTER.increment(1);
                        self.set_status(ListenerStatus::Retrying { attempt });
                        self.retry_delay()
                    }
                    RetryDecision::GiveUp => {
                        error!(
                            max = self.config.max_reconnect_tries,
                            error = %reason,
                            "Maximum listener reconnection attempts reached"
                        );
                        self.set_status(ListenerStatus::Failed);
                        self.collaborators
                            .notify(keys::LISTENER_RECONNECT_FAILED, Severity::Error);
                        return;
                    }
                }
            };

            tokio::time::sleep(delay).await;

            let _session = self.session.lock().await;
            if !self.is_current(generation) {
                return;
            }
            self.set_status(ListenerStatus::Starting);
        }
    }

    fn retry_delay(&self) -> Duration {
        let base = self.config.reconnect_delay;
        let jitter_ms = fastrand::u64(0..=(base.as_millis() as u64) / 4);
        base + Duration::from_millis(jitter_ms)
    }

    async fn connect_and_dispatch(
        &self,
        generation: u64,
        endpoint: &Endpoint,
        address: &Address,
    ) -> SessionEnd {
        let mut connection =
            ChannelConnection::new(endpoint.socket_url(), self.config.handshake_timeout);

        let disconnect = match connection.open().await {
            Ok(disconnect) => disconnect,
            Err(e) => return SessionEnd::Lost(e),
        };

        let (sender, mut events) = create_event_channel();
        if let Err(e) = attach_topic_listeners(&connection, address, sender) {
            connection.close();
            return SessionEnd::Lost(e);
        }

        {
            let mut session = self.session.lock().await;
            if !self.is_current(generation) {
                connection.close();
                return SessionEnd::Superseded;
            }
            session.connection = Some(connection);
            self.set_status(ListenerStatus::Active);
        }

        CONNECTED_GAUGE.set(1.0);
        info!(endpoint = %endpoint, address = %address, "Listener active");

        self.dispatch_until_disconnect(generation, &mut events, disconnect)
            .await
    }

    async fn dispatch_until_disconnect(
        &self,
        generation: u64,
        events: &mut EventReceiver,
        mut disconnect: Disconnect,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => {
                    // frames queued before a stop are ignored
                    if !self.is_current(generation) {
                        return SessionEnd::Superseded;
                    }
                    self.dispatch(event);
                }
                reason = &mut disconnect => {
                    return match reason {
                        Ok(reason) => SessionEnd::Lost(reason),
                        Err(_) => SessionEnd::Superseded,
                    };
                }
            }
        }
    }

    fn dispatch(&self, event: ChainEvent) {
        EVENTS_DISPATCHED_COUNTER.increment(1);
        let collaborators = &self.collaborators;

        match event {
            ChainEvent::NewBlock(block) => {
                debug!(height = block.height, "New block");
                collaborators.state.commit(StateCommit::NewBlock(block));
            }
            ChainEvent::TransactionStatusError(status) => {
                warn!(hash = %status.hash, code = %status.code, "Transaction rejected by node");
                collaborators.notify(&status.humanized(), Severity::Error);
            }
            ChainEvent::CosignatureAdded(cosignature) => {
                info!(parent_hash = %cosignature.parent_hash, "Cosignature added");
                collaborators.notify(keys::NEW_COSIGNATURE, Severity::Success);
            }
            ChainEvent::PartialTransactionAdded(transaction) => {
                info!(hash = ?transaction.hash(), "Aggregate bonded transaction added");
                collaborators.notify(keys::NEW_AGGREGATE_BONDED, Severity::Success);
            }
            ChainEvent::ConfirmedTransaction(transaction) => {
                self.save_transaction(&transaction, TransactionStatusGroup::Confirmed);
            }
            ChainEvent::UnconfirmedTransactionAdded(transaction) => {
                self.save_transaction(&transaction, TransactionStatusGroup::Unconfirmed);
            }
            ChainEvent::UnconfirmedTransactionRemoved { hash } => {
                collaborators.state.commit(StateCommit::RemoveTransaction {
                    hash,
                    group: TransactionStatusGroup::Unconfirmed,
                });
            }
            ChainEvent::PartialTransactionRemoved { hash } => {
                collaborators.state.commit(StateCommit::RemoveTransaction {
                    hash,
                    group: TransactionStatusGroup::Partial,
                });
            }
        }
    }

    fn save_transaction(&self, transaction: &Transaction, group: TransactionStatusGroup) {
        if transaction.transaction_info.is_none() {
            debug!(?group, "Skipping transaction without transaction info");
            return;
        }
        self.collaborators.transactions.format_and_save_new_transaction(
            transaction,
            FormatOptions {
                transaction_status_group: group,
            },
        );
    }
}

fn attach_topic_listeners(
    connection: &ChannelConnection,
    address: &Address,
    sender: EventSender,
) -> Result<()> {
    for kind in ChannelKind::ALL {
        let stream = TopicListener::new(connection, kind)?.listen_for(address)?;
        tokio::spawn(forward_events(stream, sender.clone()));
    }
    Ok(())
}

async fn forward_events(mut stream: ChainEventStream, sender: EventSender) {
    while let Some(event) = stream.next().await {
        if sender.send(event).await.is_err() {
            break;
        }
    }
}
