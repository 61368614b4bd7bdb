/// file: src/types.rs
/// description: wire data models for the node websocket channels and REST handshake
/// reference: https://docs.symbol.dev/api.html#websockets
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// UInt64 values arrive as decimal strings, plain numbers, or the legacy
// [lower, higher] pair of 32-bit words.
pub mod uint64 {
    use super::*;

    fn from_value<E: serde::de::Error>(value: Value) -> Result<u64, E> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| E::custom(format!("{} is not an unsigned integer", n))),
            Value::String(s) => s.parse::<u64>().map_err(E::custom),
            Value::Array(words) if words.len() == 2 => {
                let lower = words[0].as_u64().filter(|w| *w <= u32::MAX as u64);
                let higher = words[1].as_u64().filter(|w| *w <= u32::MAX as u64);
                match (lower, higher) {
                    (Some(lower), Some(higher)) => Ok((higher << 32) | lower),
                    _ => Err(E::custom("invalid uint64 word pair")),
                }
            }
            other => Err(E::custom(format!("unexpected uint64 value: {}", other))),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        from_value(Value::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => from_value(value).map(Some),
        }
    }
}

// Subscription protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribe: Option<String>,
}

impl SubscriptionRequest {
    pub fn subscribe(uid: &str, channel: &str) -> Self {
        Self {
            uid: uid.to_string(),
            subscribe: Some(channel.to_string()),
            unsubscribe: None,
        }
    }

    pub fn unsubscribe(uid: &str, channel: &str) -> Self {
        Self {
            uid: uid.to_string(),
            subscribe: None,
            unsubscribe: Some(channel.to_string()),
        }
    }
}

// Blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockFrame {
    pub block: BlockHeader,
    #[serde(default)]
    pub meta: Option<BlockMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    #[serde(deserialize_with = "uint64::deserialize")]
    pub height: u64,
    #[serde(default, deserialize_with = "uint64::deserialize_option")]
    pub timestamp: Option<u64>,
    #[serde(default, alias = "signer")]
    pub signer_public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMeta {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub generation_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: Option<u64>,
    pub hash: Option<String>,
    pub generation_hash: Option<String>,
    pub signer_public_key: Option<String>,
}

impl From<BlockFrame> for BlockInfo {
    fn from(frame: BlockFrame) -> Self {
        let meta = frame.meta.unwrap_or(BlockMeta {
            hash: None,
            generation_hash: None,
        });
        Self {
            height: frame.block.height,
            timestamp: frame.block.timestamp,
            hash: meta.hash,
            generation_hash: meta.generation_hash,
            signer_public_key: frame.block.signer_public_key,
        }
    }
}

// Transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[serde(default, deserialize_with = "uint64::deserialize")]
    pub height: u64,
    pub hash: String,
    #[serde(default)]
    pub merkle_component_hash: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub transaction_type: u16,
    #[serde(default)]
    pub version: Option<u8>,
    #[serde(default)]
    pub network: Option<u8>,
    #[serde(alias = "signer")]
    pub signer_public_key: String,
    #[serde(default, alias = "fee", deserialize_with = "uint64::deserialize")]
    pub max_fee: u64,
    #[serde(default, deserialize_with = "uint64::deserialize")]
    pub deadline: u64,
    /// Type specific fields, kept undecoded.
    #[serde(flatten)]
    pub body: Map<String, Value>,
    #[serde(skip)]
    pub transaction_info: Option<TransactionInfo>,
}

impl Transaction {
    pub fn hash(&self) -> Option<&str> {
        self.transaction_info.as_ref().map(|info| info.hash.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFrame {
    pub transaction: Transaction,
    #[serde(default)]
    pub meta: Option<TransactionInfo>,
}

impl From<TransactionFrame> for Transaction {
    fn from(frame: TransactionFrame) -> Self {
        Transaction {
            transaction_info: frame.meta,
            ..frame.transaction
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedTransactionFrame {
    pub meta: RemovedTransactionMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedTransactionMeta {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusError {
    pub hash: String,
    #[serde(alias = "status")]
    pub code: String,
    #[serde(default, deserialize_with = "uint64::deserialize_option")]
    pub deadline: Option<u64>,
    #[serde(default)]
    pub address: Option<String>,
}

impl TransactionStatusError {
    /// `Failure_Core_Insufficient_Balance` -> `Failure Core Insufficient Balance`
    pub fn humanized(&self) -> String {
        self.code.replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosignatureSignedTransaction {
    pub parent_hash: String,
    pub signature: String,
    #[serde(alias = "signer")]
    pub signer_public_key: String,
}

// REST handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainHeight {
    #[serde(deserialize_with = "uint64::deserialize")]
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkName {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
