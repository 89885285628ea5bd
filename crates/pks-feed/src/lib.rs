//! pks-feed
//!
//! Record feed boundary: turns a named source into an ordered sequence of
//! [`SalesLine`] values. The simulation engine never touches files; it only
//! sees what a [`RecordFeed`] hands it.
//!
//! Concrete feeds:
//! - [`CsvRecordFeed`]: sales export CSV on local disk (see [`csv_feed`] for the
//!   column contract).

pub mod csv_feed;

use std::fmt;

use pks_schemas::SalesLine;

pub use csv_feed::{parse_order_date, parse_sales_csv_str, CsvRecordFeed};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a feed may return. Any of them is fatal for the run that asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The source could not be opened or read.
    Io(String),
    /// The header row is missing a required column.
    MissingHeader(String),
    /// A record field could not be parsed into the expected type.
    ParseField {
        row: usize,
        field: &'static str,
        raw: String,
    },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Io(msg) => write!(f, "feed io error: {msg}"),
            FeedError::MissingHeader(col) => {
                write!(f, "feed missing required header column: '{col}'")
            }
            FeedError::ParseField { row, field, raw } => {
                write!(f, "feed row {row}: cannot parse field '{field}' from value '{raw}'")
            }
        }
    }
}

impl std::error::Error for FeedError {}

// ---------------------------------------------------------------------------
// Feed trait
// ---------------------------------------------------------------------------

/// Produces the finite, ordered sales-line sequence for one named source.
///
/// Implementations may block (file I/O); async callers run them on a blocking
/// thread.
pub trait RecordFeed: Send + Sync {
    fn source_name(&self) -> &'static str;

    fn load(&self, source: &str) -> Result<Vec<SalesLine>, FeedError>;
}
