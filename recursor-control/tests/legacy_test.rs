//! Integration tests for the legacy datagram protocol
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::unreachable
)]

mod support;

use std::{
    collections::{HashMap, HashSet},
    fmt::Write,
    time::Duration,
};

use pretty_assertions::assert_eq;
use recursor_control::{ControlClient, ControlError, ErrorKind, Protocol};
use support::{DatagramReply, entries, spawn_datagram_peer, spawn_datagram_server};
use tempfile::TempDir;

struct Dirs {
    server: TempDir,
    recv: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            server: TempDir::new().unwrap(),
            recv: TempDir::new().unwrap(),
        }
    }

    fn client(&self) -> ControlClient {
        ControlClient::new(self.server.path().join("pdns_recursor.controlsocket"))
            .with_protocol(Protocol::Legacy)
            .with_socket_dir(self.recv.path())
            .with_timeout(Duration::from_secs(2))
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_get_all() {
    let dirs = Dirs::new();
    let client = dirs.client();
    let peer = spawn_datagram_peer(
        client.socket_path(),
        DatagramReply::Send(b"all-outqueries\t42\nanswers-slow\t7\ncache-hits\tNaN\n".to_vec()),
    );

    let stats = client.get_all().await.unwrap();

    let expected: HashMap<String, i64> = [
        ("all-outqueries".to_string(), 42),
        ("answers-slow".to_string(), 7),
    ]
    .into_iter()
    .collect();
    assert_eq!(stats.fields, expected);
    assert_eq!(stats.skipped.len(), 1);

    let received = peer.await.unwrap();
    assert_eq!(received.payload, b"get-all\n");
    assert_eq!(received.sender.parent(), Some(dirs.recv.path()));
    assert_eq!(received.mode, 0o666);

    assert_eq!(entries(dirs.recv.path()), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_configured_socket_mode() {
    let dirs = Dirs::new();
    let client = dirs.client().with_socket_mode(0o660);
    let peer = spawn_datagram_peer(
        client.socket_path(),
        DatagramReply::Send(b"a\t1\n".to_vec()),
    );

    client.get_all().await.unwrap();

    assert_eq!(peer.await.unwrap().mode, 0o660);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_zero_length_reply() {
    let dirs = Dirs::new();
    let client = dirs.client();
    let _peer = spawn_datagram_peer(client.socket_path(), DatagramReply::Send(Vec::new()));

    let err = client.get_all().await.unwrap_err();

    assert!(matches!(err, ControlError::NoDataReceived));
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_eq!(entries(dirs.recv.path()), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_timeout() {
    let dirs = Dirs::new();
    let client = dirs.client().with_timeout(Duration::from_millis(200));
    let _peer = spawn_datagram_peer(client.socket_path(), DatagramReply::Silent);

    let err = client.get_all().await.unwrap_err();

    assert!(matches!(err, ControlError::Timeout(d) if d == Duration::from_millis(200)));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(entries(dirs.recv.path()), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_missing_control_socket() {
    let dirs = Dirs::new();
    let client = dirs.client();

    let err = client.get_all().await.unwrap_err();

    assert!(matches!(err, ControlError::Connect { .. }));
    assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
    assert_eq!(entries(dirs.recv.path()), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_truncated_reply_drops_partial_line() {
    let dirs = Dirs::new();
    let client = dirs.client();

    let mut body = String::new();
    let mut i = 0;
    while body.len() <= recursor_control::legacy::RECV_BUFFER_SIZE {
        writeln!(body, "counter-{i}\t{i}").unwrap();
        i += 1;
    }
    let _peer = spawn_datagram_peer(client.socket_path(), DatagramReply::Send(body.into_bytes()));

    let stats = client.get_all().await.unwrap();

    assert!(stats.fields.len() < i);
    assert_eq!(stats.fields.get("counter-0"), Some(&0));
    assert!(stats.skipped.is_empty());
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_sequential_exchanges_use_fresh_endpoints() {
    let dirs = Dirs::new();
    let client = dirs.client();

    let peer = spawn_datagram_peer(client.socket_path(), DatagramReply::Send(b"a\t1\n".to_vec()));
    client.get_all().await.unwrap();
    let first = peer.await.unwrap().sender;

    std::fs::remove_file(client.socket_path()).unwrap();
    let peer = spawn_datagram_peer(client.socket_path(), DatagramReply::Send(b"a\t2\n".to_vec()));
    let stats = client.get_all().await.unwrap();
    let second = peer.await.unwrap().sender;

    assert_eq!(stats.fields.get("a"), Some(&2));
    assert_ne!(first, second);
    assert_eq!(entries(dirs.recv.path()), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_concurrent_exchanges_use_distinct_endpoints() {
    const EXCHANGES: usize = 8;

    let dirs = Dirs::new();
    let client = dirs.client();
    let server = spawn_datagram_server(client.socket_path(), b"questions\t1\n", EXCHANGES);

    let handles: Vec<_> = (0..EXCHANGES)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get_all().await })
        })
        .collect();

    for handle in handles {
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.fields.get("questions"), Some(&1));
    }

    let senders: HashSet<_> = server
        .await
        .unwrap()
        .into_iter()
        .map(|received| received.sender)
        .collect();
    assert_eq!(senders.len(), EXCHANGES);
    assert_eq!(entries(dirs.recv.path()), 0);
}
