//! Integration tests for the raw transport against a loopback TCP server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use chatwire_client::protocol::{encode_frame, LENGTH_SIZE};
use chatwire_client::{Endpoint, SocketSession, TransportKind};

use common::{assert_no_event, next_event, recording, recording_failing_on, Event};

async fn raw_session_and_server() -> (SocketSession, TcpListener) {
    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    let endpoint = Endpoint::new("ws://127.0.0.1:1/ws", "127.0.0.1", port);
    (SocketSession::new(endpoint, TransportKind::Raw), server)
}

/// Read one length-prefixed frame from the server side.
async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; LENGTH_SIZE];
    stream.read_exact(&mut header).await.unwrap();
    let length = ((header[0] as usize) << 16) | ((header[1] as usize) << 8) | header[2] as usize;
    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload).await.unwrap();
    payload
}

#[tokio::test]
async fn test_open_precedes_messages_delivered_in_order() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept().await.unwrap();
        let mut wire = encode_frame(b"first").unwrap();
        wire.extend(encode_frame(b"second").unwrap());
        wire.extend(encode_frame(b"third").unwrap());
        stream.write_all(&wire).await.unwrap();
        stream
    });

    session.connect(listener).await.unwrap();
    assert!(session.is_open());

    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert_eq!(next_event(&mut rx).await, Event::Message(b"first".to_vec()));
    assert_eq!(next_event(&mut rx).await, Event::Message(b"second".to_vec()));
    assert_eq!(next_event(&mut rx).await, Event::Message(b"third".to_vec()));

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_fragmented_frame_reassembled() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept().await.unwrap();
        let wire = encode_frame(b"delivered in tiny pieces").unwrap();
        // Dribble the frame out one byte at a time, splitting the header too.
        for byte in wire {
            stream.write_all(&[byte]).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        stream
    });

    session.connect(listener).await.unwrap();

    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert_eq!(
        next_event(&mut rx).await,
        Event::Message(b"delivered in tiny pieces".to_vec())
    );

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_send_binary_arrives_whole() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept().await.unwrap();
        read_frame(&mut stream).await
    });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);

    let wire = encode_frame(b"outbound payload").unwrap();
    session.send_binary(&wire).await.unwrap();

    assert_eq!(server_task.await.unwrap(), b"outbound payload");
}

#[tokio::test]
async fn test_concurrent_sends_are_not_interleaved() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    const SENDERS: usize = 8;

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept().await.unwrap();
        let mut received = Vec::new();
        for _ in 0..SENDERS {
            received.push(read_frame(&mut stream).await);
        }
        received
    });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);

    let session = Arc::new(session);
    let mut expected = Vec::new();
    let mut tasks = Vec::new();
    for i in 0..SENDERS {
        // Distinct fill byte and length per sender, so any interleaving
        // would corrupt a frame.
        let payload = vec![i as u8 + 1; 512 + i * 37];
        expected.push(payload.clone());
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            let wire = encode_frame(&payload).unwrap();
            session.send_binary(&wire).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Spawn order is not lock-acquisition order, so arrival order is not
    // assertable; comparing sorted sets proves every frame arrived whole
    // and uninterleaved.
    let mut received = server_task.await.unwrap();
    received.sort();
    expected.sort();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_no_message_after_close() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move { server.accept().await.unwrap().0 });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);

    session.disconnect().await;
    assert_eq!(next_event(&mut rx).await, Event::Close);

    // A frame arriving once teardown has completed must never reach the
    // listener: on_close is terminal.
    let mut stream = server_task.await.unwrap();
    let _ = stream.write_all(&encode_frame(b"too late").unwrap()).await;
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn test_concurrent_connects_open_once() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move { server.accept().await.unwrap().0 });

    let session = Arc::new(session);
    let racers: Vec<_> = (0..2)
        .map(|_| {
            let session = Arc::clone(&session);
            let listener = listener.clone();
            tokio::spawn(async move { session.connect(listener).await })
        })
        .collect();
    for racer in racers {
        racer.await.unwrap().unwrap();
    }

    assert!(session.is_open());
    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert_no_event(&mut rx).await;

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_send_without_channel_is_noop() {
    let (session, _server) = raw_session_and_server().await;
    assert!(session.send_binary(b"dropped").await.is_ok());
    assert!(!session.is_open());
}

#[tokio::test]
async fn test_connect_when_open_is_noop() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move { server.accept().await.unwrap().0 });

    session.connect(listener.clone()).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);

    // Second connect while open: succeeds immediately, no second on_open.
    session.connect(listener).await.unwrap();
    assert_no_event(&mut rx).await;

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_connect_failure_invokes_no_callbacks() {
    // Bind then drop to obtain a port nothing listens on.
    let (session, server) = raw_session_and_server().await;
    drop(server);

    let (listener, mut rx) = recording();
    let result = session.connect(listener).await;

    assert!(result.is_err());
    assert!(!session.is_open());
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn test_double_disconnect_single_close() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move { server.accept().await.unwrap().0 });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert!(session.is_open());

    session.disconnect().await;
    assert!(!session.is_open());
    session.disconnect().await;

    assert_eq!(next_event(&mut rx).await, Event::Close);
    assert_no_event(&mut rx).await;

    // Send after disconnect: nothing to send to, still a success.
    assert!(session.send_binary(b"late").await.is_ok());

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_disconnect_concurrent_with_send() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move { server.accept().await.unwrap().0 });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);

    let session = Arc::new(session);
    let sender = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let wire = encode_frame(&vec![0x42; 4096]).unwrap();
            // Outcome depends on who wins the lock; both are acceptable.
            let _ = session.send_binary(&wire).await;
        })
    };
    session.disconnect().await;
    sender.await.unwrap();

    assert_eq!(next_event(&mut rx).await, Event::Close);
    assert_no_event(&mut rx).await;

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_peer_eof_closes_session_once() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move {
        let (stream, _) = server.accept().await.unwrap();
        drop(stream); // immediate EOF
    });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert_eq!(next_event(&mut rx).await, Event::Close);
    assert!(!session.is_open());
    assert_no_event(&mut rx).await;

    server_task.await.unwrap();
}

#[tokio::test]
async fn test_zero_length_abandons_cycle_silently() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept().await.unwrap();
        let mut wire = encode_frame(b"before violation").unwrap();
        wire.extend_from_slice(&[0, 0, 0]); // zero-length frame
        wire.extend(encode_frame(b"never read").unwrap());
        stream.write_all(&wire).await.unwrap();
        stream
    });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert_eq!(
        next_event(&mut rx).await,
        Event::Message(b"before violation".to_vec())
    );
    // The cycle ends silently: no error, no close, no further messages.
    assert_no_event(&mut rx).await;

    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_listener_fault_redirected_and_cycle_continues() {
    let (session, server) = raw_session_and_server().await;
    let (listener, mut rx) = recording_failing_on(b"poison");

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept().await.unwrap();
        let mut wire = encode_frame(b"poison").unwrap();
        wire.extend(encode_frame(b"after the fault").unwrap());
        stream.write_all(&wire).await.unwrap();
        stream
    });

    session.connect(listener).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Open);
    assert_eq!(next_event(&mut rx).await, Event::Message(b"poison".to_vec()));

    match next_event(&mut rx).await {
        Event::Error(message) => assert!(message.contains("listener failure")),
        other => panic!("expected listener fault redirection, got {other:?}"),
    }

    assert_eq!(
        next_event(&mut rx).await,
        Event::Message(b"after the fault".to_vec())
    );

    drop(server_task.await.unwrap());
}
