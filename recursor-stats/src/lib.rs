//! Statistics collection for `PowerDNS` Recursor instances
//!
//! Queries every configured control socket in turn using
//! [`recursor_control`] and hands each result to an [`Accumulator`]:
//!
//! ```text
//! Config → [ServerTarget] → gather → ControlClient::get_all → Accumulator
//! ```
//!
//! A failing target never prevents the remaining targets from being queried.

pub mod config;
pub mod gather;
pub mod logging;
pub mod sink;

pub use config::{Config, ConfigError, SAMPLE_CONFIG, ServerConfig, ServerTarget, SocketMode};
pub use gather::{Accumulator, GatherError, GatherSummary, MEASUREMENT, MetricRecord, gather};
pub use sink::{JsonSink, LineProtocolSink, MemorySink};
