/// file: src/events.rs
/// description: typed chain events and the shared queue feeding the dispatch loop
use crate::channel::ChannelKind;
use crate::types::{BlockInfo, CosignatureSignedTransaction, Transaction, TransactionStatusError};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    NewBlock(BlockInfo),
    ConfirmedTransaction(Transaction),
    UnconfirmedTransactionAdded(Transaction),
    UnconfirmedTransactionRemoved { hash: String },
    PartialTransactionAdded(Transaction),
    PartialTransactionRemoved { hash: String },
    TransactionStatusError(TransactionStatusError),
    CosignatureAdded(CosignatureSignedTransaction),
}

impl ChainEvent {
    /// The channel this event was delivered on.
    pub fn channel(&self) -> ChannelKind {
        match self {
            ChainEvent::NewBlock(_) => ChannelKind::Block,
            ChainEvent::ConfirmedTransaction(_) => ChannelKind::ConfirmedAdded,
            ChainEvent::UnconfirmedTransactionAdded(_) => ChannelKind::UnconfirmedAdded,
            ChainEvent::UnconfirmedTransactionRemoved { .. } => ChannelKind::UnconfirmedRemoved,
            ChainEvent::PartialTransactionAdded(_) => ChannelKind::PartialAdded,
            ChainEvent::PartialTransactionRemoved { .. } => ChannelKind::PartialRemoved,
            ChainEvent::TransactionStatusError(_) => ChannelKind::Status,
            ChainEvent::CosignatureAdded(_) => ChannelKind::Cosignature,
        }
    }
}

// Forwarders wait once the dispatch loop is this far behind.
const EVENT_CHANNEL_CAPACITY: usize = 10_000;

pub type EventSender = mpsc::Sender<ChainEvent>;
pub type EventReceiver = mpsc::Receiver<ChainEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
