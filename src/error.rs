use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Channel connection is not open")]
    NotConnected,

    #[error("Handshake failed: {reason}")]
    HandshakeFailed { reason: String },

    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}

pub type Result<T> = std::result::Result<T, ListenerError>;
