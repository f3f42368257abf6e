//! # chatwire-client
//!
//! Transport layer for a chat-protocol client: a session abstraction that
//! moves opaque binary messages across either of two physical transports
//! while presenting one uniform message-oriented contract to the layer
//! above.
//!
//! ## Architecture
//!
//! - **Stream transport**: HTTP-upgraded duplex channel; physical chunks
//!   are reassembled into length-prefixed frames.
//! - **Raw transport**: bidirectional TCP socket; a self-resuming read
//!   cycle alternates between 3-byte length headers and exact-length
//!   payloads.
//! - **Error policy**: a pure classification of faults into recovery
//!   actions, consumed by the layer that owns reconnection.
//!
//! Handshake, encryption, and message decoding are external collaborators:
//! this layer only delivers exact-length byte sequences and lifecycle
//! events.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatwire_client::{Endpoint, SocketSession, TransportKind};
//!
//! #[tokio::main]
//! async fn main() -> chatwire_client::Result<()> {
//!     let endpoint = Endpoint::new("wss://chat.example.net/ws", "chat.example.net", 443);
//!     let session = SocketSession::new(endpoint, TransportKind::Raw);
//!     session.connect(Arc::new(MyListener)).await?;
//!     session.send_binary(&encoded).await?;
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod endpoint;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

pub use endpoint::{Endpoint, ProxyAuthenticator, SystemAuthenticator};
pub use error::{HmacValidationError, Result, TransportError};
pub use handler::{default_handler, Action, ClientType, ErrorHandler, Location};
pub use transport::{SocketListener, SocketSession, TransportKind};
