// file: src/topic.rs
// description: per-channel listener decoding raw frames into typed chain events

use crate::{
    address::Address,
    channel::{ChannelKind, ChannelSubscription},
    connection::{ChannelConnection, ConnectionHandle},
    error::Result,
    events::ChainEvent,
    types::{
        BlockFrame, CosignatureSignedTransaction, RemovedTransactionFrame, Transaction,
        TransactionFrame, TransactionStatusError,
    },
};
use futures_util::{StreamExt, future, stream::BoxStream};
use serde_json::Value;
use tracing::debug;

/// Lazy, unbounded sequence of decoded events. Ends when the parent
/// connection closes.
pub type ChainEventStream = BoxStream<'static, ChainEvent>;

pub struct TopicListener {
    kind: ChannelKind,
    connection: ConnectionHandle,
}

impl TopicListener {
    pub fn new(connection: &ChannelConnection, kind: ChannelKind) -> Result<Self> {
        Ok(Self {
            kind,
            connection: connection.handle()?,
        })
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn listen_for(&self, address: &Address) -> Result<ChainEventStream> {
        let subscription = ChannelSubscription::new(self.kind, address);
        let frames = self.connection.route(&subscription);
        self.connection.subscribe(&subscription)?;
        debug!(channel = %subscription, "Subscribed to channel");

        let kind = self.kind;
        let stream = futures_util::stream::unfold(frames, |mut frames| async move {
            frames.recv().await.map(|frame| (frame, frames))
        })
        .filter_map(move |frame| future::ready(decode(kind, frame)));

        Ok(stream.boxed())
    }

    pub fn unsubscribe(&self, address: &Address) -> Result<()> {
        let subscription = ChannelSubscription::new(self.kind, address);
        self.connection.unsubscribe(&subscription)?;
        debug!(channel = %subscription, "Unsubscribed from channel");
        Ok(())
    }
}

/// Decodes one frame for `kind`. Frames missing required fields yield
/// `None`; transaction frames count as incomplete without transaction info.
pub fn decode(kind: ChannelKind, frame: Value) -> Option<ChainEvent> {
    let decoded = match kind {
        ChannelKind::Block => {
            serde_json::from_value::<BlockFrame>(frame).map(|f| Some(ChainEvent::NewBlock(f.into())))
        }
        ChannelKind::ConfirmedAdded => {
            decode_transaction(frame).map(|tx| tx.map(ChainEvent::ConfirmedTransaction))
        }
        ChannelKind::UnconfirmedAdded => {
            decode_transaction(frame).map(|tx| tx.map(ChainEvent::UnconfirmedTransactionAdded))
        }
        ChannelKind::PartialAdded => {
            decode_transaction(frame).map(|tx| tx.map(ChainEvent::PartialTransactionAdded))
        }
        ChannelKind::UnconfirmedRemoved => serde_json::from_value::<RemovedTransactionFrame>(frame)
            .map(|f| Some(ChainEvent::UnconfirmedTransactionRemoved { hash: f.meta.hash })),
        ChannelKind::PartialRemoved => serde_json::from_value::<RemovedTransactionFrame>(frame)
            .map(|f| Some(ChainEvent::PartialTransactionRemoved { hash: f.meta.hash })),
        ChannelKind::Status => serde_json::from_value::<TransactionStatusError>(frame)
            .map(|status| Some(ChainEvent::TransactionStatusError(status))),
        ChannelKind::Cosignature => serde_json::from_value::<CosignatureSignedTransaction>(frame)
            .map(|cosignature| Some(ChainEvent::CosignatureAdded(cosignature))),
    };

    match decoded {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(channel = %kind, "Dropping transaction without transaction info");
            None
        }
        Err(e) => {
            debug!(channel = %kind, error = %e, "Dropping undecodable frame");
            None
        }
    }
}

fn decode_transaction(frame: Value) -> serde_json::Result<Option<Transaction>> {
    let frame: TransactionFrame = serde_json::from_value(frame)?;
    if frame.meta.is_none() {
        return Ok(None);
    }
    Ok(Some(frame.into()))
}
