//! Error types for chatwire-client.

use thiserror::Error;

/// Main error type for all transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket error (upgrade, send or receive).
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A send operation failed; carries the original cause.
    #[error("request failed")]
    SendFailed(#[source] Box<TransportError>),

    /// The underlying channel is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// Frame length outside the valid 1..=16777215 range.
    #[error("invalid frame length: {0}")]
    InvalidLength(usize),

    /// Proxy address could not be resolved to a socket address.
    #[error("proxy address unresolved: {0}")]
    UnresolvedProxy(String),

    /// Fault raised by the listener while consuming a message.
    #[error("listener failure: {0}")]
    Listener(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wrap an error as a failed send outcome.
    pub(crate) fn send_failed(cause: impl Into<TransportError>) -> Self {
        Self::SendFailed(Box::new(cause.into()))
    }
}

/// Signals that a message failed HMAC validation in the cryptographic layer.
///
/// The transport never produces this error; it exists so the error policy
/// can recognize the fault kind when the owning layer classifies failures.
#[derive(Debug, Error)]
#[error("HMAC validation failed")]
pub struct HmacValidationError;

/// Result type alias using TransportError.
pub type Result<T> = std::result::Result<T, TransportError>;
