//! User-facing error message formatting.
//!
//! Uses typed error matching (LoadError, PolarsError variants, io::ErrorKind)
//! rather than string parsing to produce short, actionable messages.

use crate::error::{LoadError, ValidationError};
use polars::prelude::PolarsError;
use std::io;

/// Format a LoadError as the notice shown after a failed load.
pub fn user_message_from_load(err: &LoadError) -> String {
    match err {
        LoadError::Parse(msg) => format!("Could not read the CSV file: {}", msg),
        LoadError::Connection(msg) => format!("Warehouse connection error: {}", msg),
        LoadError::Query(msg) => format!("Query failed: {}", msg),
        LoadError::Timeout { .. } => "API request timed out. Please try again.".to_string(),
        LoadError::Transport(msg) => format!("API error: {}", msg),
        LoadError::Http { status, reason } => {
            format!("API error: server returned {} {}", status, reason)
        }
        LoadError::Decode(msg) => format!("API error: {}", msg),
    }
}

/// Format a ValidationError as the message that replaces every view.
pub fn user_message_from_validation(err: &ValidationError) -> String {
    match err {
        ValidationError::NoData => {
            "No data loaded. Select a data source to get started.".to_string()
        }
        ValidationError::Empty => "Dataset is empty".to_string(),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::Duplicate(msg) => format!("Duplicate column: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::SchemaFieldNotFound(msg) => format!("Schema field not found: {}", msg),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::SQLInterface(msg) | PE::SQLSyntax(msg) => msg.to_string(),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::ConnectionRefused => "Connection refused.".to_string(),
        ErrorKind::ConnectionReset => "Connection reset.".to_string(),
        ErrorKind::TimedOut => "Operation timed out.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Keep only the first line of a ComputeError; Polars appends hints on later lines.
fn simplify_compute_message(msg: &str) -> String {
    msg.lines().next().unwrap_or(msg).trim().to_string()
}
