//! Client for the `PowerDNS` Recursor control socket
//!
//! A running Recursor exposes its statistics through a local control socket.
//! Two incompatible wire protocols exist:
//! - [`legacy`]: newline terminated text over Unix datagrams (Recursor < 4.6)
//! - [`v3`]: length prefixed frames over a Unix stream (Recursor >= 4.6)
//!
//! Both drivers issue a single `get-all` command and hand the reply to
//! [`response::parse_response`], which turns `name<TAB>value` lines into
//! integer counters.
//!
//! The v3 protocol encodes its length fields as the server's native `size_t`,
//! see [`codec`] for the consequences.

pub mod client;
pub mod codec;
pub mod error;
pub mod legacy;
pub mod response;
pub mod v3;

pub use client::{ControlClient, Protocol};
pub use codec::{ByteOrder, NativeLayout};
pub use error::{ControlError, ErrorKind, Result};
pub use response::{MalformedLine, Statistics, parse_response};

/// Default path of the Recursor control socket
pub const DEFAULT_CONTROL_SOCKET: &str = "/var/run/pdns_recursor.controlsocket";

/// Default directory in which the legacy driver creates its receive socket
pub const DEFAULT_SOCKET_DIR: &str = "/var/run";

/// Default permission bits of the legacy receive socket
pub const DEFAULT_SOCKET_MODE: u32 = 0o666;

/// Default deadline for a complete request/response exchange, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// The only command this client sends
pub const GET_ALL: &str = "get-all";
