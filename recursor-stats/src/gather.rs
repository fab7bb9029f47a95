//! Querying every configured target and forwarding the results

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use chrono::{DateTime, Utc};
use recursor_control::{ControlError, ErrorKind, Protocol};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ServerTarget;

/// Measurement name of every record
pub const MEASUREMENT: &str = "powerdns_recursor";

/// Tag carrying the queried socket path
pub const SERVER_TAG: &str = "server";

/// The statistics of one Recursor at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRecord {
    pub measurement: &'static str,
    pub tags: BTreeMap<String, String>,
    pub fields: HashMap<String, i64>,
    pub timestamp: DateTime<Utc>,
}

impl MetricRecord {
    /// A record for `server` stamped with the current time
    #[must_use]
    pub fn new(server: &ServerTarget, fields: HashMap<String, i64>) -> Self {
        let tags = BTreeMap::from([(
            SERVER_TAG.to_string(),
            server.socket.to_string_lossy().into_owned(),
        )]);

        Self {
            measurement: MEASUREMENT,
            tags,
            fields,
            timestamp: Utc::now(),
        }
    }

    /// The socket path this record was gathered from
    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.tags.get(SERVER_TAG).map(String::as_str)
    }
}

/// A target that could not be queried
#[derive(Debug, Error)]
#[error("Failed to gather statistics from {} ({protocol}): {source}", .server.display())]
pub struct GatherError {
    pub server: PathBuf,
    pub protocol: Protocol,
    pub source: ControlError,
}

impl GatherError {
    /// Classification of the underlying failure
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Receiver of gathered statistics
pub trait Accumulator {
    /// Handle the statistics of one target
    fn add_fields(&mut self, record: MetricRecord);

    /// Handle a target that failed
    fn add_error(&mut self, error: GatherError);
}

/// Outcome counts of one [`gather`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatherSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl GatherSummary {
    /// Whether at least one target was tried and none succeeded
    #[must_use]
    pub const fn all_failed(&self) -> bool {
        self.succeeded == 0 && self.failed > 0
    }
}

/// Query each target in turn and forward the outcome to `accumulator`
///
/// Targets are queried one after another in the given order. A failing target
/// is reported through [`Accumulator::add_error`] and does not stop the
/// remaining targets from being queried.
pub async fn gather<A>(targets: &[ServerTarget], accumulator: &mut A) -> GatherSummary
where
    A: Accumulator + ?Sized,
{
    let mut summary = GatherSummary::default();

    for target in targets {
        match target.client().get_all().await {
            Ok(statistics) => {
                debug!(
                    "Gathered {} counters from {} ({} lines skipped)",
                    statistics.fields.len(),
                    target.socket.display(),
                    statistics.skipped.len()
                );
                accumulator.add_fields(MetricRecord::new(target, statistics.fields));
                summary.succeeded += 1;
            }
            Err(source) => {
                debug!("Failed to query {}: {source}", target.socket.display());
                accumulator.add_error(GatherError {
                    server: target.socket.clone(),
                    protocol: target.protocol,
                    source,
                });
                summary.failed += 1;
            }
        }
    }

    summary
}
