// file: src/channel.rs
// description: websocket channel names and per-address subscriptions

use crate::address::Address;
use std::fmt;
use std::str::FromStr;

/// The fixed set of channels a node publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Block,
    ConfirmedAdded,
    UnconfirmedAdded,
    UnconfirmedRemoved,
    PartialAdded,
    PartialRemoved,
    Status,
    Cosignature,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 8] = [
        ChannelKind::Block,
        ChannelKind::ConfirmedAdded,
        ChannelKind::UnconfirmedAdded,
        ChannelKind::UnconfirmedRemoved,
        ChannelKind::PartialAdded,
        ChannelKind::PartialRemoved,
        ChannelKind::Status,
        ChannelKind::Cosignature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Block => "block",
            ChannelKind::ConfirmedAdded => "confirmedAdded",
            ChannelKind::UnconfirmedAdded => "unconfirmedAdded",
            ChannelKind::UnconfirmedRemoved => "unconfirmedRemoved",
            ChannelKind::PartialAdded => "partialAdded",
            ChannelKind::PartialRemoved => "partialRemoved",
            ChannelKind::Status => "status",
            ChannelKind::Cosignature => "cosignature",
        }
    }

    /// Every channel except `block` is scoped to an address.
    pub fn is_address_scoped(&self) -> bool {
        !matches!(self, ChannelKind::Block)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown channel '{}'", s))
    }
}

/// One socket-level subscription: a channel plus, for scoped channels,
/// the address it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSubscription {
    pub kind: ChannelKind,
    pub address: Option<Address>,
}

impl ChannelSubscription {
    pub fn new(kind: ChannelKind, address: &Address) -> Self {
        Self {
            kind,
            address: kind.is_address_scoped().then(|| address.clone()),
        }
    }

    /// Splits a topic such as `confirmedAdded/SBILTA...` into its kind and
    /// raw address text.
    pub fn split_topic(topic: &str) -> Option<(ChannelKind, Option<&str>)> {
        match topic.split_once('/') {
            Some((kind, address)) => Some((kind.parse().ok()?, Some(address))),
            None => Some((topic.parse().ok()?, None)),
        }
    }
}

impl fmt::Display for ChannelSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{}/{}", self.kind, address),
            None => f.write_str(self.kind.as_str()),
        }
    }
}
