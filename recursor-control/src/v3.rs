//! V3 stream protocol (Recursor >= 4.6)
//!
//! A single request/response exchange over a Unix stream socket:
//!
//! ```text
//! request:  [status: u32 = 0][length: size_t][command bytes]
//! response: [status: u32    ][length: size_t][body bytes   ]
//! ```
//!
//! Both `size_t` fields use the native layout of the machine, see
//! [`crate::codec`]. Every length is checked exactly; a body that is shorter
//! than declared is never decoded.

use std::{path::Path, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};
use tracing::{debug, trace};

use crate::{ControlError, GET_ALL, NativeLayout, Result, Statistics, parse_response};

/// Width of the status field in both directions
const STATUS_LEN: usize = 4;

/// Largest response body this client will allocate for (64MiB)
pub const MAX_RESPONSE_SIZE: u64 = 64 * 1024 * 1024;

/// Query `socket` for all statistics using the v3 protocol
///
/// # Errors
///
/// Returns an error if this machine's `size_t` layout is unsupported, the
/// control socket cannot be reached, the exchange exceeds `timeout`, or the
/// response violates the framing.
pub async fn get_all(socket: &Path, timeout: Duration) -> Result<Statistics> {
    get_all_with_layout(socket, NativeLayout::detect()?, timeout).await
}

/// Like [`get_all`], but with an explicit length layout
///
/// # Errors
///
/// See [`get_all`].
pub async fn get_all_with_layout(
    socket: &Path,
    layout: NativeLayout,
    timeout: Duration,
) -> Result<Statistics> {
    let body = tokio::time::timeout(timeout, exchange(socket, layout))
        .await
        .map_err(|_| ControlError::Timeout(timeout))??;

    Ok(parse_response(&body))
}

async fn exchange(socket: &Path, layout: NativeLayout) -> Result<String> {
    debug!("Connecting to control socket: {}", socket.display());
    let mut stream = UnixStream::connect(socket)
        .await
        .map_err(|source| ControlError::Connect {
            path: socket.to_path_buf(),
            source,
        })?;

    let command = GET_ALL.as_bytes();
    let command_len = layout.encode_length(command.len())?;

    stream
        .write_all(&[0u8; STATUS_LEN])
        .await
        .map_err(ControlError::Write)?;
    stream
        .write_all(&command_len)
        .await
        .map_err(ControlError::Write)?;
    stream
        .write_all(command)
        .await
        .map_err(ControlError::Write)?;
    stream.flush().await.map_err(ControlError::Write)?;

    let mut status = [0u8; STATUS_LEN];
    match read_full(&mut stream, &mut status)
        .await
        .map_err(ControlError::Read)?
    {
        0 => return Err(ControlError::NoStatusReceived),
        STATUS_LEN => trace!("Received status: {}", u32::from_ne_bytes(status)),
        received => {
            return Err(ControlError::ShortRead {
                expected: STATUS_LEN,
                received,
            });
        }
    }

    let mut length_buf = vec![0u8; layout.width()];
    let received = read_full(&mut stream, &mut length_buf)
        .await
        .map_err(ControlError::Read)?;
    let length = layout.decode_length(&length_buf[..received])?;

    if length == 0 {
        return Err(ControlError::EmptyResponse);
    }

    let too_large = || ControlError::ResponseTooLarge {
        length,
        max: MAX_RESPONSE_SIZE,
    };
    if length > MAX_RESPONSE_SIZE {
        return Err(too_large());
    }
    let expected = usize::try_from(length).map_err(|_| too_large())?;

    trace!("Receiving response: {expected} bytes");

    let mut body = vec![0u8; expected];
    let received = read_full(&mut stream, &mut body)
        .await
        .map_err(ControlError::Read)?;
    if received != expected {
        return Err(ControlError::IncompleteResponse { expected, received });
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Read until `buf` is full or the peer closes, returning the bytes read
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
