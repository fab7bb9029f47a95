//! Client for querying a single Recursor control socket

use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    DEFAULT_SOCKET_DIR, DEFAULT_SOCKET_MODE, DEFAULT_TIMEOUT_SECS, Result, Statistics, legacy, v3,
};

/// Wire protocol spoken by a Recursor control socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// Datagram protocol of Recursor < 4.6
    #[default]
    Legacy,
    /// Length prefixed stream protocol of Recursor >= 4.6
    V3,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::V3 => "v3",
        })
    }
}

/// Client for one Recursor control socket
///
/// Every call to [`ControlClient::get_all`] performs one independent exchange;
/// the client keeps no connection or other state between calls.
#[derive(Debug, Clone)]
pub struct ControlClient {
    socket_path: PathBuf,
    protocol: Protocol,
    socket_dir: PathBuf,
    socket_mode: u32,
    timeout: Duration,
}

impl ControlClient {
    /// Create a new client for the control socket at `socket_path`
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            protocol: Protocol::default(),
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            socket_mode: DEFAULT_SOCKET_MODE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the wire protocol
    #[must_use]
    pub const fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the directory for the legacy receive socket
    #[must_use]
    pub fn with_socket_dir(mut self, socket_dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = socket_dir.into();
        self
    }

    /// Set the permission bits of the legacy receive socket
    #[must_use]
    pub const fn with_socket_mode(mut self, socket_mode: u32) -> Self {
        self.socket_mode = socket_mode;
        self
    }

    /// Set the deadline for a whole exchange
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the control socket this client queries
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Protocol this client speaks
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Fetch all statistics counters
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails for any reason, see
    /// [`crate::ControlError`].
    pub async fn get_all(&self) -> Result<Statistics> {
        debug!(
            "Querying {} using the {} protocol",
            self.socket_path.display(),
            self.protocol
        );

        match self.protocol {
            Protocol::Legacy => {
                legacy::get_all(
                    &self.socket_path,
                    &self.socket_dir,
                    self.socket_mode,
                    self.timeout,
                )
                .await
            }
            Protocol::V3 => v3::get_all(&self.socket_path, self.timeout).await,
        }
    }
}
