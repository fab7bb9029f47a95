//! Legacy datagram protocol (Recursor < 4.6)
//!
//! The client binds a uniquely named datagram socket, sends `get-all\n` to the
//! control socket and waits for a single reply datagram, which the Recursor
//! sends back to the bound path. The reply has no framing beyond the datagram
//! itself.

use std::{
    fs::Permissions,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::net::UnixDatagram;
use tracing::{debug, trace, warn};

use crate::{ControlError, GET_ALL, Result, Statistics, parse_response};

/// Capacity of the reply buffer. Larger replies are truncated by the kernel.
pub const RECV_BUFFER_SIZE: usize = 16_384;

/// Prefix of the receive socket's file name
const ENDPOINT_PREFIX: &str = "pdns_recursor_stats";

/// A bound receive socket that is unlinked when dropped
#[derive(Debug)]
struct EphemeralEndpoint {
    path: PathBuf,
    socket: UnixDatagram,
}

impl EphemeralEndpoint {
    /// Bind a fresh, randomly named socket in `dir` and apply `mode` to it
    async fn bind(dir: &Path, mode: u32) -> Result<Self> {
        let path = endpoint_path(dir);

        let socket = UnixDatagram::bind(&path).map_err(|source| ControlError::Bind {
            path: path.clone(),
            source,
        })?;
        let endpoint = Self { path, socket };

        tokio::fs::set_permissions(&endpoint.path, Permissions::from_mode(mode))
            .await
            .map_err(|source| ControlError::Permissions {
                path: endpoint.path.clone(),
                source,
            })?;

        debug!(
            "Bound receive socket {} with mode {mode:o}",
            endpoint.path.display()
        );

        Ok(endpoint)
    }
}

impl Drop for EphemeralEndpoint {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed receive socket {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove receive socket {}: {e}",
                self.path.display()
            ),
        }
    }
}

/// A receive socket path in `dir` that no concurrent exchange will pick
fn endpoint_path(dir: &Path) -> PathBuf {
    let suffix = rand::random::<u64>() >> 1;
    dir.join(format!("{ENDPOINT_PREFIX}{suffix}"))
}

/// Query `socket` for all statistics using the datagram protocol
///
/// The receive socket is created in `socket_dir` with permission bits `mode`
/// so that the Recursor can reply regardless of the user it runs as. It is
/// removed again on every exit path.
///
/// # Errors
///
/// Returns an error if the receive socket cannot be set up, the control
/// socket cannot be reached, the exchange exceeds `timeout`, or the reply is
/// empty.
pub async fn get_all(
    socket: &Path,
    socket_dir: &Path,
    mode: u32,
    timeout: Duration,
) -> Result<Statistics> {
    let endpoint = EphemeralEndpoint::bind(socket_dir, mode).await?;

    let response = tokio::time::timeout(timeout, exchange(&endpoint.socket, socket))
        .await
        .map_err(|_| ControlError::Timeout(timeout))??;

    Ok(parse_response(&response))
}

async fn exchange(local: &UnixDatagram, socket: &Path) -> Result<String> {
    debug!("Connecting to control socket: {}", socket.display());
    local
        .connect(socket)
        .map_err(|source| ControlError::Connect {
            path: socket.to_path_buf(),
            source,
        })?;

    let command = format!("{GET_ALL}\n");
    local
        .send(command.as_bytes())
        .await
        .map_err(ControlError::Write)?;

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let received = local.recv(&mut buf).await.map_err(ControlError::Read)?;
    if received == 0 {
        return Err(ControlError::NoDataReceived);
    }

    trace!("Received response: {received} bytes");

    Ok(String::from_utf8_lossy(&buf[..received]).into_owned())
}
