//! Configuration for the statistics collector
//!
//! Configuration is written in RON:
//!
//! ```ron
//! (
//!     unix_sockets: ["/var/run/pdns_recursor.controlsocket"],
//!     socket_dir: "/var/run",
//!     socket_mode: "0666",
//!     protocol: Legacy,
//!     timeout_secs: 5,
//! )
//! ```
//!
//! Every field is optional. Targets listed under `servers` may override the
//! global `protocol`, `socket_dir` and `socket_mode`.

use std::{
    fmt::{Display, Formatter},
    num::ParseIntError,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use recursor_control::{
    ControlClient, DEFAULT_CONTROL_SOCKET, DEFAULT_SOCKET_DIR, DEFAULT_SOCKET_MODE,
    DEFAULT_TIMEOUT_SECS, Protocol,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "RECURSOR_STATS_CONFIG";

/// Configuration files tried, in order, when none is given explicitly
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = [
    "./recursor-stats.config.ron",
    "/etc/recursor-stats/recursor-stats.config.ron",
];

/// An annotated configuration that reproduces the defaults
pub const SAMPLE_CONFIG: &str = r#"(
    // Paths to the Recursor control sockets, all queried with the settings below.
    unix_sockets: ["/var/run/pdns_recursor.controlsocket"],

    // Targets that need their own settings.
    // servers: [
    //     (socket: "/run/pdns-recursor/pdns_recursor.controlsocket", protocol: Some(V3)),
    // ],

    // Directory for the legacy protocol's receive socket. This default is
    // likely not writable, pick a directory both processes can access.
    socket_dir: "/var/run",

    // Permission bits of the receive socket, in octal.
    socket_mode: "0666",

    // Legacy for Recursor < 4.6, V3 for 4.6 and newer.
    protocol: Legacy,

    // Deadline for one complete exchange.
    timeout_secs: 5,
)
"#;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid RON
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The path given in the environment does not exist
    #[error("RECURSOR_STATS_CONFIG points to non-existent file: {}", .0.display())]
    MissingEnvPath(PathBuf),

    /// A socket mode is not an octal permission value
    #[error("Could not parse socket_mode {value:?}: {reason}")]
    InvalidSocketMode { value: String, reason: String },
}

/// Permission bits of the legacy receive socket, written in octal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketMode(u32);

impl SocketMode {
    /// Build a mode from raw permission bits
    ///
    /// # Errors
    ///
    /// Returns an error if `bits` has anything set beyond `0o7777`.
    pub fn new(bits: u32) -> Result<Self, ConfigError> {
        if bits > 0o7777 {
            return Err(ConfigError::InvalidSocketMode {
                value: format!("{bits:o}"),
                reason: "permission bits out of range".to_string(),
            });
        }
        Ok(Self(bits))
    }

    /// The raw permission bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for SocketMode {
    fn default() -> Self {
        Self(DEFAULT_SOCKET_MODE)
    }
}

impl Display for SocketMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl FromStr for SocketMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0o").unwrap_or(s);
        let bits = u32::from_str_radix(digits, 8).map_err(|e: ParseIntError| {
            ConfigError::InvalidSocketMode {
                value: s.to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::new(bits)
    }
}

impl<'de> Deserialize<'de> for SocketMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for SocketMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A configured target, possibly overriding the global settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Path to the Recursor control socket
    pub socket: PathBuf,

    /// Wire protocol, defaults to the global `protocol`
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// Receive socket directory, defaults to the global `socket_dir`
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,

    /// Receive socket mode, defaults to the global `socket_mode`
    #[serde(default)]
    pub socket_mode: Option<SocketMode>,
}

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Targets with individual settings
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Targets that use the global settings
    #[serde(default)]
    pub unix_sockets: Vec<PathBuf>,

    /// Directory in which legacy receive sockets are created
    ///
    /// Default: `/var/run`
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Permission bits of legacy receive sockets
    ///
    /// Default: `"0666"`
    #[serde(default)]
    pub socket_mode: SocketMode,

    /// Wire protocol of targets that do not set their own
    ///
    /// Default: `Legacy`
    #[serde(default)]
    pub protocol: Protocol,

    /// Deadline for one complete exchange
    ///
    /// Default: 5 seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_DIR)
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            unix_sockets: Vec::new(),
            socket_dir: default_socket_dir(),
            socket_mode: SocketMode::default(),
            protocol: Protocol::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// One Recursor instance to query, with every setting resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    pub socket: PathBuf,
    pub protocol: Protocol,
    pub socket_dir: PathBuf,
    pub socket_mode: SocketMode,
    pub timeout: Duration,
}

impl ServerTarget {
    /// A target at `socket` using the default settings
    #[must_use]
    pub fn new(socket: impl Into<PathBuf>, protocol: Protocol) -> Self {
        Self {
            socket: socket.into(),
            protocol,
            socket_dir: default_socket_dir(),
            socket_mode: SocketMode::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// A client that queries this target
    #[must_use]
    pub fn client(&self) -> ControlClient {
        ControlClient::new(&self.socket)
            .with_protocol(self.protocol)
            .with_socket_dir(&self.socket_dir)
            .with_socket_mode(self.socket_mode.bits())
            .with_timeout(self.timeout)
    }
}

impl Config {
    /// Parse a RON configuration
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid configuration.
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    /// Read and parse the configuration file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content)
    }

    /// Load the configuration using the following precedence:
    /// 1. `explicit`, typically given on the command line
    /// 2. the `RECURSOR_STATS_CONFIG` environment variable
    /// 3. the first existing entry of [`DEFAULT_CONFIG_PATHS`]
    ///
    /// Without any configuration file the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if a named file does not exist, or if the chosen file
    /// cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            if !path.exists() {
                return Err(ConfigError::MissingEnvPath(path));
            }
            return Self::from_file(&path);
        }

        for path in DEFAULT_CONFIG_PATHS.iter().map(Path::new) {
            if path.exists() {
                debug!("Using configuration file {}", path.display());
                return Self::from_file(path);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// The targets to query, in configuration order
    ///
    /// `servers` come first, followed by `unix_sockets`. When neither lists
    /// anything, the default control socket is queried.
    #[must_use]
    pub fn targets(&self) -> Vec<ServerTarget> {
        let timeout = Duration::from_secs(self.timeout_secs);

        let mut targets: Vec<ServerTarget> = self
            .servers
            .iter()
            .map(|server| ServerTarget {
                socket: server.socket.clone(),
                protocol: server.protocol.unwrap_or(self.protocol),
                socket_dir: server
                    .socket_dir
                    .clone()
                    .unwrap_or_else(|| self.socket_dir.clone()),
                socket_mode: server.socket_mode.unwrap_or(self.socket_mode),
                timeout,
            })
            .collect();

        let sockets = if self.servers.is_empty() && self.unix_sockets.is_empty() {
            vec![PathBuf::from(DEFAULT_CONTROL_SOCKET)]
        } else {
            self.unix_sockets.clone()
        };

        targets.extend(sockets.into_iter().map(|socket| ServerTarget {
            socket,
            protocol: self.protocol,
            socket_dir: self.socket_dir.clone(),
            socket_mode: self.socket_mode,
            timeout,
        }));

        targets
    }
}
