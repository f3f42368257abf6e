//! Stream transport: frames over an HTTP-upgraded streaming socket.
//!
//! The channel delivers physical chunks whose boundaries are independent of
//! frame boundaries, so a spawned read task feeds every binary delivery
//! into a [`ChunkAssembler`] and pushes the completed frames to the
//! listener. The WebSocket library completes fragment reassembly itself,
//! so each delivery reaches the assembler marked final; the assembler
//! nevertheless implements the full final/continued contract.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{client_async, connect_async, MaybeTlsStream, WebSocketStream};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::protocol::ChunkAssembler;

use super::{deliver, SocketListener};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Session over an HTTP-upgraded duplex byte channel.
pub struct WebSocketSession {
    endpoint: Endpoint,
    inner: Arc<Inner>,
}

struct Inner {
    /// Write-exclusivity lock guarding the channel's sink half. Tokio's
    /// mutex queues waiters FIFO, so contending senders transmit in lock
    /// acquisition order.
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    open: AtomicBool,
    closed: AtomicBool,
    listener: OnceLock<Arc<dyn SocketListener>>,
    read_task: OnceLock<JoinHandle<()>>,
}

impl WebSocketSession {
    /// Build an inert session; `connect` performs the upgrade.
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

    /// Upgrade to a duplex channel at the endpoint's fixed URL, dialing
    /// through the resolved proxy when one is configured.
    ///
    /// No-op success when already open. On success `on_open` fires before
    /// this returns; on failure no listener callback is invoked.
    pub async fn connect(&self, listener: Arc<dyn SocketListener>) -> Result<()> {
        // The writer lock doubles as the connect guard: concurrent
        // connect calls serialize here and the loser observes the open
        // flag instead of upgrading a second channel.
        let mut writer = self.inner.writer.lock().await;
        if self.is_open() {
            return Ok(());
        }

        let ws = match self.endpoint.resolve_proxy()? {
            Some(proxy) => {
                let stream = TcpStream::connect(proxy).await?;
                let (ws, _response) =
                    client_async(self.endpoint.ws_url(), MaybeTlsStream::Plain(stream)).await?;
                ws
            }
            None => connect_async(self.endpoint.ws_url()).await?.0,
        };
        tracing::debug!(url = self.endpoint.ws_url(), "websocket upgraded");

        let _ = self.inner.listener.set(listener.clone());
        let (sink, stream) = ws.split();
        *writer = Some(sink);
        self.inner.open.store(true, Ordering::SeqCst);
        listener.on_open();

        let task = self
            .endpoint
            .handle()
            .spawn(read_loop(stream, Arc::clone(&self.inner)));
        let _ = self.inner.read_task.set(task);
        Ok(())
    }

    /// Tear down the channel. Idempotent; see [`SocketSession::disconnect`].
    ///
    /// [`SocketSession::disconnect`]: super::SocketSession::disconnect
    pub async fn disconnect(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Null the channel before anything can observe torn state.
        self.inner.open.store(false, Ordering::SeqCst);
        let sink = self.inner.writer.lock().await.take();

        if let Some(listener) = self.inner.listener.get() {
            listener.on_close();
        }

        // Best-effort close: the channel may already be broken.
        if let Some(mut sink) = sink {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }

        if let Some(task) = self.inner.read_task.get() {
            task.abort();
        }
    }

    /// Send one whole binary message under the write-exclusivity lock.
    ///
    /// With no channel present this is a successful no-op: there is
    /// nothing to send to.
    pub async fn send_binary(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.inner.writer.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Ok(());
        };

        sink.send(Message::Binary(bytes.to_vec()))
            .await
            .map_err(TransportError::send_failed)
    }

    /// True iff the channel is present and not torn down.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for WebSocketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketSession")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Inner {
    /// Close observed from the channel side (peer close or stream end).
    /// Shares the closed guard with `disconnect` so `on_close` fires at
    /// most once per generation.
    async fn close_notified(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.open.store(false, Ordering::SeqCst);
        self.writer.lock().await.take();

        if let Some(listener) = self.listener.get() {
            listener.on_close();
        }
    }
}

async fn read_loop(mut stream: SplitStream<WsStream>, inner: Arc<Inner>) {
    let Some(listener) = inner.listener.get().cloned() else {
        return;
    };
    let mut assembler = ChunkAssembler::new();

    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Binary(data)) => {
                if inner.closed.load(Ordering::SeqCst) {
                    return;
                }
                for frame in assembler.push(Bytes::from(data), true) {
                    deliver(&listener, frame);
                }
            }
            Ok(Message::Close(_)) => break,
            // Ping, pong and text are not part of the message contract.
            Ok(_) => {}
            Err(error) => {
                // Failures caused by our own teardown are expected and
                // swallowed.
                if inner.closed.load(Ordering::SeqCst) {
                    return;
                }
                listener.on_error(error.into());
            }
        }
    }

    // Buffered reassembly state never survives a close.
    assembler.clear();
    inner.close_notified().await;
}
