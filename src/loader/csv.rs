//! CSV upload loader.

use crate::config::FileLoadingConfig;
use crate::error::LoadError;
use crate::error_display::user_message_from_polars;
use crate::table::Table;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Parse uploaded bytes into a table. The header row supplies column names.
pub fn load_csv_bytes(bytes: &[u8], options: &FileLoadingConfig) -> Result<Table, LoadError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(LoadError::Parse("file is empty".to_string()));
    }

    let separator = options.delimiter.unwrap_or(b',');
    let null_values = (!options.null_values.is_empty()).then(|| {
        NullValues::AllColumns(options.null_values.iter().map(|v| v.as_str().into()).collect())
    });
    let read = |infer_schema_length: Option<usize>| {
        let read_options = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(infer_schema_length)
            .with_ignore_errors(options.ignore_errors)
            .map_parse_options(|opts| {
                opts.with_separator(separator)
                    .with_try_parse_dates(options.parse_dates)
                    .with_null_values(null_values.clone())
            });
        CsvReader::new(Cursor::new(bytes))
            .with_options(read_options)
            .finish()
    };

    // A value past the inference window that does not fit the guessed type
    // fails the sampled read; the full scan widens the column instead.
    let df = read(Some(options.infer_schema_length))
        .or_else(|e| {
            debug!(error = %e, "sampled schema rejected, rescanning whole file");
            read(None)
        })
        .and_then(trim_column_names)
        .map_err(|e| LoadError::Parse(user_message_from_polars(&e)))?;

    debug!(rows = df.height(), columns = df.width(), "parsed csv upload");
    Ok(Table::new(df))
}

/// Read a CSV file from disk. Read failures are reported as parse failures of the upload.
pub fn load_csv_path(path: &Path, options: &FileLoadingConfig) -> Result<Table, LoadError> {
    let bytes = std::fs::read(path)
        .map_err(|e| LoadError::Parse(format!("{}: {}", path.display(), e)))?;
    load_csv_bytes(&bytes, options)
}

/// Header cells often carry stray whitespace; strip it so column names match what users type.
fn trim_column_names(df: DataFrame) -> PolarsResult<DataFrame> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let trimmed: Vec<String> = names.iter().map(|s| s.trim().to_string()).collect();
    if names == trimmed {
        return Ok(df);
    }
    df.lazy()
        .rename(
            names.iter().map(|s| s.as_str()),
            trimmed.iter().map(|s| s.as_str()),
            false,
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;

    const SALES: &[u8] = b"date,category,value\n2024-01-01,A,100\n2024-01-02,B,150\n";

    #[test]
    fn loads_header_and_rows() {
        let table = load_csv_bytes(SALES, &FileLoadingConfig::default()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["date", "category", "value"]);
        assert_eq!(table.column_kind("value"), Some(ColumnKind::Integer));
        assert_eq!(table.column_kind("date"), Some(ColumnKind::Text));
    }

    #[test]
    fn parses_dates_when_enabled() {
        let options = FileLoadingConfig {
            parse_dates: true,
            ..FileLoadingConfig::default()
        };
        let table = load_csv_bytes(SALES, &options).unwrap();
        assert_eq!(table.column_kind("date"), Some(ColumnKind::Date));
    }

    #[test]
    fn header_only_is_a_zero_row_table() {
        let table = load_csv_bytes(b"a,b\n", &FileLoadingConfig::default()).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        let err = load_csv_bytes(b"", &FileLoadingConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn late_float_widens_integer_column() {
        let mut csv = String::from("id,value\n");
        for i in 0..1500 {
            csv.push_str(&format!("{},{}\n", i, i));
        }
        csv.push_str("1500,2.5\n");

        let table = load_csv_bytes(csv.as_bytes(), &FileLoadingConfig::default()).unwrap();
        assert_eq!(table.row_count(), 1501);
        assert_eq!(table.column_kind("value"), Some(ColumnKind::Float));
        assert_eq!(table.column_kind("id"), Some(ColumnKind::Integer));
    }

    #[test]
    fn late_text_turns_column_categorical() {
        let mut csv = String::from("code\n");
        for i in 0..1200 {
            csv.push_str(&format!("{}\n", i));
        }
        csv.push_str("X9\n");

        let table = load_csv_bytes(csv.as_bytes(), &FileLoadingConfig::default()).unwrap();
        assert_eq!(table.row_count(), 1201);
        assert_eq!(table.column_kind("code"), Some(ColumnKind::Text));
    }

    #[test]
    fn na_markers_are_missing_values() {
        let csv = b"cat,value,ratio\nA,1,0.5\nB,NA,NaN\nC,3,null\nD,N/A,0.1\n";
        let table = load_csv_bytes(csv, &FileLoadingConfig::default()).unwrap();
        assert_eq!(table.column_kind("value"), Some(ColumnKind::Integer));
        assert_eq!(table.column_kind("ratio"), Some(ColumnKind::Float));
        assert_eq!(table.missing_in("value").unwrap(), 2);
        assert_eq!(table.missing_in("ratio").unwrap(), 2);
        assert_eq!(table.missing_in("cat").unwrap(), 0);
    }

    #[test]
    fn empty_null_marker_list_keeps_text() {
        let options = FileLoadingConfig {
            null_values: Vec::new(),
            ..FileLoadingConfig::default()
        };
        let table = load_csv_bytes(b"cat,value\nA,1\nB,NA\n", &options).unwrap();
        assert_eq!(table.column_kind("value"), Some(ColumnKind::Text));
    }

    #[test]
    fn extra_fields_are_a_parse_error() {
        let err = load_csv_bytes(b"a,b\n1,2\n3,4,5,6\n", &FileLoadingConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)), "{err:?}");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = load_csv_bytes(b"name,n\nab\xff\xfe,1\n", &FileLoadingConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)), "{err:?}");
    }

    #[test]
    fn custom_delimiter_and_trimmed_headers() {
        let options = FileLoadingConfig {
            delimiter: Some(b';'),
            ..FileLoadingConfig::default()
        };
        let table = load_csv_bytes(b" a ; b\n1;2\n", &options).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }
}
