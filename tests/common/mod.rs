//! Shared test fixtures: a recording listener that forwards every callback
//! into an mpsc channel so tests can assert on ordering and counts.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;

use chatwire_client::{SocketListener, TransportError};

/// One observed listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Close,
    Error(String),
    Message(Vec<u8>),
}

/// Listener that records every callback. Optionally returns a fault from
/// `on_message` for one configured payload, to exercise the redirection of
/// listener faults to `on_error`.
pub struct RecordingListener {
    tx: mpsc::UnboundedSender<Event>,
    fail_on: Option<Vec<u8>>,
}

impl SocketListener for RecordingListener {
    fn on_open(&self) {
        let _ = self.tx.send(Event::Open);
    }

    fn on_close(&self) {
        let _ = self.tx.send(Event::Close);
    }

    fn on_error(&self, error: TransportError) {
        let _ = self.tx.send(Event::Error(error.to_string()));
    }

    fn on_message(
        &self,
        message: Bytes,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = self.tx.send(Event::Message(message.to_vec()));
        if self.fail_on.as_deref() == Some(&message[..]) {
            return Err("listener fault".into());
        }
        Ok(())
    }
}

pub fn recording() -> (Arc<RecordingListener>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingListener { tx, fail_on: None }), rx)
}

pub fn recording_failing_on(
    payload: &[u8],
) -> (Arc<RecordingListener>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(RecordingListener {
            tx,
            fail_on: Some(payload.to_vec()),
        }),
        rx,
    )
}

/// Await the next recorded event, failing the test after five seconds.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for listener event")
        .expect("listener channel closed")
}

/// Assert that no further event arrives within a short window.
pub async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<Event>) {
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        rx.try_recv().is_err(),
        "expected no further listener events"
    );
}
