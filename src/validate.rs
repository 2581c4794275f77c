//! Gate between loading and every view: no table, or an empty one, stops the render.

use crate::error::ValidationError;
use crate::table::Table;

pub fn validate(table: Option<&Table>) -> Result<&Table, ValidationError> {
    match table {
        None => Err(ValidationError::NoData),
        Some(t) if t.row_count() == 0 => Err(ValidationError::Empty),
        Some(t) => Ok(t),
    }
}
