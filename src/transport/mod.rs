//! Transport module - the session abstraction over both physical transports.
//!
//! A [`SocketSession`] moves opaque binary messages across either an
//! HTTP-upgraded streaming socket ([`WebSocketSession`]) or a raw TCP
//! socket ([`RawSocketSession`]). Both variants present the same contract:
//! connect / disconnect / send / is-open, with incoming frames pushed to a
//! [`SocketListener`]. The hierarchy is closed - exactly these two variants,
//! selected by a [`TransportKind`] at construction and matched exhaustively.

mod raw;
mod websocket;

use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;

pub use raw::RawSocketSession;
pub use websocket::WebSocketSession;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// The four callbacks a transport invokes on its consumer.
///
/// `on_open` precedes every other callback of a session generation;
/// `on_close` is terminal. A fault returned by `on_message` is redirected
/// to `on_error` at the delivery site and never unwinds into the
/// transport's read logic.
pub trait SocketListener: Send + Sync + 'static {
    /// The session's channel was established.
    fn on_open(&self);

    /// The session closed. Invoked at most once per generation.
    fn on_close(&self);

    /// A runtime failure occurred. The session stays open; the consumer
    /// decides whether to disconnect.
    fn on_error(&self, error: TransportError);

    /// One complete frame payload arrived.
    ///
    /// # Errors
    ///
    /// Any error returned here is caught by the transport and redirected
    /// to [`on_error`](Self::on_error).
    fn on_message(&self, message: Bytes) -> std::result::Result<(), Box<dyn Error + Send + Sync>>;
}

/// Which physical transport a session is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// HTTP-upgraded streaming socket.
    WebSocket,
    /// Raw bidirectional TCP socket.
    Raw,
}

/// A message-oriented session over one of the two physical transports.
///
/// Constructed inert (no channel); `connect` establishes the channel once.
/// A session is not reconnectable in place - the owning layer discards it
/// and constructs a new one.
#[derive(Debug)]
pub enum SocketSession {
    /// Stream transport variant.
    WebSocket(WebSocketSession),
    /// Raw transport variant.
    Raw(RawSocketSession),
}

impl SocketSession {
    /// Build an inert session on the given transport.
    pub fn new(endpoint: Endpoint, kind: TransportKind) -> Self {
        match kind {
            TransportKind::WebSocket => Self::WebSocket(WebSocketSession::new(endpoint)),
            TransportKind::Raw => Self::Raw(RawSocketSession::new(endpoint)),
        }
    }

    /// Establish the underlying channel.
    ///
    /// A no-op success when already open. On success `listener.on_open()`
    /// fires before this returns; on failure the error is returned without
    /// any listener callback.
    pub async fn connect(&self, listener: Arc<dyn SocketListener>) -> Result<()> {
        match self {
            Self::WebSocket(session) => session.connect(listener).await,
            Self::Raw(session) => session.connect(listener).await,
        }
    }

    /// Tear down the channel. Idempotent; emits `on_close` exactly once on
    /// a previously-open session and swallows errors from the underlying
    /// close.
    pub async fn disconnect(&self) {
        match self {
            Self::WebSocket(session) => session.disconnect().await,
            Self::Raw(session) => session.disconnect().await,
        }
    }

    /// Transmit one opaque binary message under the write-exclusivity lock.
    ///
    /// # Errors
    ///
    /// Failures are wrapped as [`TransportError::SendFailed`] carrying the
    /// original cause. With no channel present the send is a successful
    /// no-op.
    pub async fn send_binary(&self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::WebSocket(session) => session.send_binary(bytes).await,
            Self::Raw(session) => session.send_binary(bytes).await,
        }
    }

    /// True iff a channel is present and not torn down.
    pub fn is_open(&self) -> bool {
        match self {
            Self::WebSocket(session) => session.is_open(),
            Self::Raw(session) => session.is_open(),
        }
    }
}

/// Deliver one frame to the listener, redirecting listener faults to
/// `on_error` instead of letting them unwind into the read logic.
pub(crate) fn deliver(listener: &Arc<dyn SocketListener>, message: Bytes) {
    if let Err(error) = listener.on_message(message) {
        listener.on_error(TransportError::Listener(error));
    }
}
