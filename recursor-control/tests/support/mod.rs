//! Mock Recursor control sockets for exercising both protocol drivers
#![allow(dead_code)] // Test utility module - not all helpers used in every test

use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use recursor_control::NativeLayout;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixDatagram, UnixListener},
    task::JoinHandle,
};

/// What the datagram peer saw from the client
#[derive(Debug)]
pub struct ReceivedDatagram {
    pub payload: Vec<u8>,
    pub sender: PathBuf,
    pub mode: u32,
}

/// How the datagram peer answers a request
pub enum DatagramReply {
    /// Send these bytes back to the client's receive socket
    Send(Vec<u8>),
    /// Never answer
    Silent,
}

/// Bind a legacy control socket at `path` that answers exactly one request
pub fn spawn_datagram_peer(path: &Path, reply: DatagramReply) -> JoinHandle<ReceivedDatagram> {
    let socket = UnixDatagram::bind(path).unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 1024];
        let (received, addr) = socket.recv_from(&mut buf).await.unwrap();
        let sender = addr.as_pathname().unwrap().to_path_buf();
        let mode = std::fs::metadata(&sender).unwrap().permissions().mode() & 0o777;

        match reply {
            DatagramReply::Send(bytes) => {
                socket.send_to(&bytes, &sender).await.unwrap();
            }
            DatagramReply::Silent => tokio::time::sleep(Duration::from_secs(30)).await,
        }

        buf.truncate(received);
        ReceivedDatagram {
            payload: buf,
            sender,
            mode,
        }
    })
}

/// Bind a legacy control socket at `path` that answers `count` requests with `reply`
///
/// The returned handle resolves to every request in arrival order.
pub fn spawn_datagram_server(
    path: &Path,
    reply: &'static [u8],
    count: usize,
) -> JoinHandle<Vec<ReceivedDatagram>> {
    let socket = UnixDatagram::bind(path).unwrap();

    tokio::spawn(async move {
        let mut requests = Vec::with_capacity(count);
        for _ in 0..count {
            let mut buf = vec![0u8; 1024];
            let (received, addr) = socket.recv_from(&mut buf).await.unwrap();
            let sender = addr.as_pathname().unwrap().to_path_buf();
            let mode = std::fs::metadata(&sender).unwrap().permissions().mode() & 0o777;
            socket.send_to(reply, &sender).await.unwrap();

            buf.truncate(received);
            requests.push(ReceivedDatagram {
                payload: buf,
                sender,
                mode,
            });
        }
        requests
    })
}

/// How the stream peer answers a request
pub enum StreamReply {
    /// Write these bytes, then close the connection
    Send(Vec<u8>),
    /// Keep the connection open without answering
    Stall,
}

/// Bind a v3 control socket at `path` that serves exactly one connection
///
/// The returned handle resolves to the raw request bytes.
pub fn spawn_stream_peer(path: &Path, reply: StreamReply) -> JoinHandle<Vec<u8>> {
    let listener = UnixListener::bind(path).unwrap();
    let layout = NativeLayout::detect().unwrap();

    tokio::spawn(async move {
        let (mut stream, _addr) = listener.accept().await.unwrap();

        let mut header = vec![0u8; 4 + layout.width()];
        stream.read_exact(&mut header).await.unwrap();
        let command_len = layout.decode_length(&header[4..]).unwrap();
        let mut command = vec![0u8; usize::try_from(command_len).unwrap()];
        stream.read_exact(&mut command).await.unwrap();

        match reply {
            StreamReply::Send(bytes) => {
                stream.write_all(&bytes).await.unwrap();
                stream.flush().await.unwrap();
            }
            StreamReply::Stall => tokio::time::sleep(Duration::from_secs(30)).await,
        }

        header.extend_from_slice(&command);
        header
    })
}

/// Frame a v3 response that declares `declared` body bytes but carries `body`
pub fn v3_response(status: u32, declared: usize, body: &[u8]) -> Vec<u8> {
    let layout = NativeLayout::detect().unwrap();

    let mut frame = status.to_ne_bytes().to_vec();
    frame.extend(layout.encode_length(declared).unwrap());
    frame.extend_from_slice(body);
    frame
}

/// Number of entries in `dir`
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
