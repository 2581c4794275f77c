//! Error types for loading, validating, charting and exporting.
//!
//! Loader errors carry messages instead of source errors so that a failed load
//! can be stored in the cache and cloned back out.

use thiserror::Error;

/// A loader failed to produce a table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Malformed CSV (ragged rows, empty input, bad encoding)
    #[error("could not parse file: {0}")]
    Parse(String),

    /// The warehouse could not be reached or is not configured
    #[error("warehouse connection error: {0}")]
    Connection(String),

    /// The warehouse rejected or failed to run the query
    #[error("query failed: {0}")]
    Query(String),

    /// The API did not answer within the time bound
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// DNS, connection or other network failure
    #[error("request failed: {0}")]
    Transport(String),

    /// The API answered with an error status
    #[error("server returned {status} {reason}")]
    Http { status: u16, reason: String },

    /// The body could not be turned into rows
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// The current table is unusable; every downstream view stops.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No data loaded")]
    NoData,

    #[error("Dataset is empty")]
    Empty,
}

/// Chart construction failed. Scoped to the chart panel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("No numeric columns found for visualization")]
    NoNumericColumns,

    #[error("{kind} chart needs a column for {role}")]
    MissingRole { kind: &'static str, role: &'static str },

    #[error("column '{column}' cannot be used for {role} in a {kind} chart")]
    InvalidColumn {
        kind: &'static str,
        role: &'static str,
        column: String,
    },

    #[error("{kind} chart does not take a {role} column")]
    UnsupportedRole { kind: &'static str, role: &'static str },

    #[error("could not prepare chart data: {0}")]
    Data(String),

    #[error("could not draw chart: {0}")]
    Draw(String),
}

impl From<polars::prelude::PolarsError> for RenderError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        Self::Data(crate::error_display::user_message_from_polars(&e))
    }
}

/// Building an export artifact failed.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] polars::prelude::PolarsError),

    #[error("spreadsheet export failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("could not write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("column '{0}' is not a categorical column and cannot be used as a filter")]
    InvalidFilterColumn(String),
}

/// A dashboard view could not be produced for the current table.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("could not compute view: {0}")]
    Compute(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
