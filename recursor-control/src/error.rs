//! Error types for control socket exchanges

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Errors that can occur while querying a Recursor control socket
///
/// Every variant is fatal to the exchange it occurred in. None of them are
/// retried by the drivers.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The local receive socket could not be bound
    #[error("Failed to bind receive socket {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Permission bits could not be applied to the local receive socket
    #[error("Failed to set permissions on receive socket {}: {source}", .path.display())]
    Permissions {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The Recursor control socket could not be reached
    #[error("Failed to connect to control socket {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing the request failed
    #[error("Failed to write request: {0}")]
    Write(#[source] std::io::Error),

    /// Reading the response failed
    #[error("Failed to read response: {0}")]
    Read(#[source] std::io::Error),

    /// The exchange did not complete before its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The reply datagram was empty
    #[error("No data received")]
    NoDataReceived,

    /// The server closed the stream before sending a status code
    #[error("No status code received")]
    NoStatusReceived,

    /// The server declared a response length of zero
    #[error("Received data length was 0")]
    EmptyResponse,

    /// The response body was shorter than its declared length
    #[error("Incomplete response: expected {expected} bytes but got {received}")]
    IncompleteResponse { expected: usize, received: usize },

    /// A fixed width field was cut short
    #[error("Short read: expected {expected} bytes but got {received}")]
    ShortRead { expected: usize, received: usize },

    /// The declared response length exceeds what this client will allocate
    #[error("Response too large: {length} bytes (max {max})")]
    ResponseTooLarge { length: u64, max: u64 },

    /// The native integer width is neither 4 nor 8 bytes
    #[error("Unsupported platform: native integer width of {0} bytes")]
    UnsupportedPlatform(usize),

    /// A length does not fit into the native integer width
    #[error("Length {length} does not fit into {width} bytes")]
    LengthOverflow { length: u64, width: usize },
}

/// Coarse classification of a [`ControlError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Binding, connecting, reading or writing the socket failed
    ConnectionFailure,
    /// The deadline expired
    Timeout,
    /// The peer did not honour the framing of the protocol
    ProtocolViolation,
    /// This machine cannot speak the v3 protocol
    UnsupportedPlatform,
}

impl ControlError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Bind { .. }
            | Self::Permissions { .. }
            | Self::Connect { .. }
            | Self::Write(_)
            | Self::Read(_) => ErrorKind::ConnectionFailure,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NoDataReceived
            | Self::NoStatusReceived
            | Self::EmptyResponse
            | Self::IncompleteResponse { .. }
            | Self::ShortRead { .. }
            | Self::ResponseTooLarge { .. } => ErrorKind::ProtocolViolation,
            Self::UnsupportedPlatform(_) | Self::LengthOverflow { .. } => {
                ErrorKind::UnsupportedPlatform
            }
        }
    }
}

/// Result type for control socket operations
pub type Result<T> = std::result::Result<T, ControlError>;
