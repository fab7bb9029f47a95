//! Decoding of `get-all` responses
//!
//! Both protocols answer `get-all` with the same text body:
//!
//! ```text
//! all-outqueries\t42
//! answers-slow\t7
//! ```
//!
//! Lines that cannot be decoded are skipped and reported as [`MalformedLine`]s;
//! a partially readable response is the normal case, not an error.

use std::{collections::HashMap, num::ParseIntError};

use tracing::warn;

/// A line of the response that could not be turned into a counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// The raw line, without its terminator
    pub line: String,
    /// Why the value failed to parse
    pub error: ParseIntError,
}

/// Counters decoded from a `get-all` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Counter name to value
    pub fields: HashMap<String, i64>,
    /// Lines whose value was not a valid integer
    pub skipped: Vec<MalformedLine>,
}

/// Decode a `name<TAB>value` response body
///
/// The segment after the final line break is always discarded: it is empty
/// for a complete response and a cut off line for a truncated one. Lines
/// without a tab are ignored silently, lines whose value does not parse as an
/// `i64` are logged and collected in [`Statistics::skipped`]. If a name occurs
/// more than once, the last value wins.
pub fn parse_response(text: &str) -> Statistics {
    let mut statistics = Statistics::default();

    let mut lines: Vec<&str> = text.split('\n').collect();
    lines.pop();

    for line in lines {
        let mut parts = line.split('\t');
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        match value.parse::<i64>() {
            Ok(value) => {
                statistics.fields.insert(name.to_string(), value);
            }
            Err(error) => {
                warn!("Error parsing integer for metric {line:?}: {error}");
                statistics.skipped.push(MalformedLine {
                    line: line.to_string(),
                    error,
                });
            }
        }
    }

    statistics
}
