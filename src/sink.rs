// file: src/sink.rs
// description: collaborator interfaces the listener pushes chain state into

use crate::formatter::FormattedTransaction;
use crate::types::{BlockInfo, Transaction};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatusGroup {
    #[default]
    Confirmed,
    Unconfirmed,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointHealth {
    Loading,
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProperties {
    pub endpoint: String,
    pub generation_hash: String,
    pub height: u64,
    pub network_name: Option<String>,
}

/// A mutation of application state. The listener only ever writes these,
/// it never reads state back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "commit", rename_all = "camelCase")]
pub enum StateCommit {
    NewBlock(BlockInfo),
    AddTransaction(FormattedTransaction),
    RemoveTransaction {
        hash: String,
        group: TransactionStatusGroup,
    },
    EndpointStatus {
        endpoint: String,
        health: EndpointHealth,
    },
    NetworkProperties(NetworkProperties),
    ResetNetworkProperties,
    GenerationHashChanged {
        previous: Option<String>,
        current: String,
    },
}

pub trait StateSink: Send + Sync {
    fn commit(&self, commit: StateCommit);
}

pub trait Notifier: Send + Sync {
    fn trigger(&self, message: &str, severity: Severity);
}

pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub transaction_status_group: TransactionStatusGroup,
}

pub trait TransactionHandler: Send + Sync {
    fn format_and_save_new_transaction(&self, transaction: &Transaction, options: FormatOptions);
}

/// Message keys passed through the translator.
pub mod keys {
    pub const NEW_COSIGNATURE: &str = "new_cosignature";
    pub const NEW_AGGREGATE_BONDED: &str = "new_aggregate_bonded";
    pub const LISTENER_RECONNECT_FAILED: &str = "listener_reconnect_failed";
}

/// Built-in English messages; anything else passes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishTranslator;

impl Translator for EnglishTranslator {
    fn translate(&self, key: &str) -> String {
        match key {
            keys::NEW_COSIGNATURE => "New cosignature received".to_string(),
            keys::NEW_AGGREGATE_BONDED => "New aggregate bonded transaction received".to_string(),
            keys::LISTENER_RECONNECT_FAILED => {
                "Lost connection to node, reconnection attempts exhausted".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Everything the coordinator writes to, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub state: Arc<dyn StateSink>,
    pub notifier: Arc<dyn Notifier>,
    pub translator: Arc<dyn Translator>,
    pub transactions: Arc<dyn TransactionHandler>,
}

impl Collaborators {
    pub fn notify(&self, key: &str, severity: Severity) {
        let message = self.translator.translate(key);
        self.notifier.trigger(&message, severity);
    }
}
