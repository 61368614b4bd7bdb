#![doc = include_str!("../docs/rustdoc.md")]

/// Account address handling.
pub mod address;
/// Channel names and subscriptions.
pub mod channel;
/// Command-line argument definitions.
pub mod cli;
/// Runtime configuration model.
pub mod config;
/// Websocket connection shared by all channel listeners.
pub mod connection;
/// Listener coordinator: lifecycle, bounded reconnection and event fan-out.
pub mod coordinator;
/// Node endpoint parsing.
pub mod endpoint;
/// Error types used across the crate.
pub mod error;
/// Chain events and the dispatch queue.
pub mod events;
/// Transaction normalization.
pub mod formatter;
/// Metrics registration.
pub mod monitoring;
/// Endpoint resolution over REST.
pub mod network;
/// Reconnection budget.
pub mod reconnect;
/// Collaborator interfaces.
pub mod sink;
/// Per-channel typed listeners.
pub mod topic;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Node wire data models.
pub mod types;
/// Terminal presentation for the binary.
pub mod ui;

pub use address::Address;
pub use coordinator::{ListenerCoordinator, ListenerStatus};
pub use endpoint::Endpoint;
/// Primary crate error type.
pub use error::ListenerError;
pub use events::ChainEvent;
pub use network::NetworkManager;
