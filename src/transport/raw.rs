//! Raw transport: manual framing over a TCP socket.
//!
//! The socket carries frames back to back with no chunk markers, so a
//! spawned read task drives a self-resuming [`ReadCycle`]: read the 3-byte
//! length header (tolerating short reads), read exactly that many payload
//! bytes, deliver, re-arm. A non-positive decoded length silently ends the
//! cycle; a read failure is reported once via `on_error` and does not
//! restart it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::protocol::{ReadCycle, Step};

use super::{deliver, SocketListener};

/// Session over a raw bidirectional TCP socket.
pub struct RawSocketSession {
    endpoint: Endpoint,
    inner: Arc<Inner>,
}

struct Inner {
    /// Write-exclusivity lock guarding the channel's write half. Tokio's
    /// mutex queues waiters FIFO, so contending senders transmit in lock
    /// acquisition order.
    writer: Mutex<Option<OwnedWriteHalf>>,
    open: AtomicBool,
    closed: AtomicBool,
    listener: OnceLock<Arc<dyn SocketListener>>,
    read_task: OnceLock<JoinHandle<()>>,
}

impl RawSocketSession {
    /// Build an inert session; `connect` establishes the channel.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            inner: Arc::new(Inner {
                writer: Mutex::new(None),
                open: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                listener: OnceLock::new(),
                read_task: OnceLock::new(),
            }),
        }
    }

    /// Connect to the endpoint's fixed host and port.
    ///
    /// No-op success when already open. On success `on_open` fires and the
    /// read cycle starts; on failure no listener callback is invoked.
    pub async fn connect(&self, listener: Arc<dyn SocketListener>) -> Result<()> {
        // The writer lock doubles as the connect guard: concurrent
        // connect calls serialize here and the loser observes the open
        // flag instead of dialing a second channel.
        let mut writer = self.inner.writer.lock().await;
        if self.is_open() {
            return Ok(());
        }

        let stream =
            TcpStream::connect((self.endpoint.host(), self.endpoint.port())).await?;
        tracing::debug!(host = self.endpoint.host(), port = self.endpoint.port(), "raw socket connected");

        let _ = self.inner.listener.set(listener.clone());
        let (read_half, write_half) = stream.into_split();
        *writer = Some(write_half);
        self.inner.open.store(true, Ordering::SeqCst);
        listener.on_open();

        let task = self
            .endpoint
            .handle()
            .spawn(read_loop(read_half, Arc::clone(&self.inner)));
        let _ = self.inner.read_task.set(task);
        Ok(())
    }

    /// Tear down the channel. Idempotent; see [`SocketSession::disconnect`].
    ///
    /// [`SocketSession::disconnect`]: super::SocketSession::disconnect
    pub async fn disconnect(&self) {
        self.inner.disconnect().await;
    }

    /// Write the whole buffer under the write-exclusivity lock.
    ///
    /// With no channel present this is a successful no-op: there is
    /// nothing to send to.
    pub async fn send_binary(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.inner.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };

        writer
            .write_all(bytes)
            .await
            .map_err(TransportError::send_failed)
    }

    /// True iff the channel is present and not torn down.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for RawSocketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSocketSession")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Inner {
    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Null the channel before anything can observe torn state.
        self.open.store(false, Ordering::SeqCst);
        let writer = self.writer.lock().await.take();

        if let Some(listener) = self.listener.get() {
            listener.on_close();
        }

        // Best-effort close: the channel may already be broken.
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
        }

        if let Some(task) = self.read_task.get() {
            task.abort();
        }
    }
}

/// The self-resuming read cycle: each completed read re-arms the next one
/// until the session closes, the peer disappears, or the cycle is
/// abandoned on a protocol violation.
async fn read_loop(mut reader: OwnedReadHalf, inner: Arc<Inner>) {
    let Some(listener) = inner.listener.get().cloned() else {
        return;
    };
    let mut cycle = ReadCycle::new();

    loop {
        // Channel found closed at a frame boundary: disconnect instead of
        // arming another read.
        if cycle.is_idle() && !inner.open.load(Ordering::SeqCst) {
            inner.disconnect().await;
            return;
        }

        let n = match reader.read(cycle.window()).await {
            // EOF: the peer closed the channel underneath us.
            Ok(0) => {
                inner.disconnect().await;
                return;
            }
            Ok(n) => n,
            Err(error) => {
                // Failures caused by our own teardown are expected and
                // swallowed; anything else is pushed to the listener and
                // the cycle does not restart.
                if !inner.closed.load(Ordering::SeqCst) {
                    listener.on_error(error.into());
                }
                return;
            }
        };

        match cycle.advance(n) {
            Step::Continue => {}
            Step::Abandon => {
                tracing::debug!("non-positive frame length, abandoning read cycle");
                return;
            }
            Step::Message(payload) => {
                // A disconnect may complete between the read and this
                // point; on_close is terminal, so the frame is dropped.
                if inner.closed.load(Ordering::SeqCst) {
                    return;
                }
                deliver(&listener, payload);
            }
        }
    }
}
