//! The loaded dataset: a Polars `DataFrame` plus per-column kinds.

use polars::prelude::*;

/// Inferred scalar kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    /// Strings and categoricals.
    Text,
    /// Date and datetime columns (only produced when date parsing is enabled).
    Date,
    Boolean,
    Other,
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::String | DataType::Categorical(..) => Self::Text,
            DataType::Boolean => Self::Boolean,
            DataType::Date | DataType::Datetime(_, _) => Self::Date,
            d if d.is_integer() => Self::Integer,
            d if d.is_numeric() => Self::Float,
            _ => Self::Other,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Other => "other",
        }
    }
}

/// Name and kind of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

/// Immutable table shared between loaders, the cache, the session and every view.
///
/// Cloning is cheap: Polars columns are reference counted.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
}

impl Table {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            df: DataFrame::empty(),
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn column_count(&self) -> usize {
        self.df.width()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect()
    }

    pub fn columns(&self) -> Vec<ColumnInfo> {
        self.df
            .get_columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                kind: ColumnKind::from_dtype(c.dtype()),
            })
            .collect()
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.df
            .column(name)
            .ok()
            .map(|c| ColumnKind::from_dtype(c.dtype()))
    }

    /// Missing entries in one column: nulls, plus NaN for float columns.
    pub fn missing_in(&self, name: &str) -> PolarsResult<usize> {
        let column = self.df.column(name)?;
        let nulls = column.null_count();
        if !column.dtype().is_float() {
            return Ok(nulls);
        }
        let values = column.cast(&DataType::Float64)?;
        let nans = values.f64()?.iter().flatten().filter(|v| v.is_nan()).count();
        Ok(nulls + nans)
    }

    /// Missing entries across the whole table.
    pub fn missing_count(&self) -> PolarsResult<usize> {
        let mut total = 0;
        for name in self.column_names() {
            total += self.missing_in(&name)?;
        }
        Ok(total)
    }

    /// First `n` rows (for the data preview).
    pub fn head(&self, n: usize) -> Table {
        Table::new(self.df.head(Some(n)))
    }

    /// Cell rendered as display text; missing values render as an empty string.
    pub fn cell_text(&self, column: &str, row: usize) -> PolarsResult<String> {
        let value = self.df.column(column)?.get(row)?;
        Ok(match value {
            AnyValue::Null => String::new(),
            AnyValue::String(s) => s.to_string(),
            AnyValue::StringOwned(s) => s.to_string(),
            other => other.to_string(),
        })
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Self::new(df)
    }
}

/// Content equality: same column names, dtypes and values.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.df.schema() == other.df.schema() && self.df.equals_missing(&other.df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_dtypes() -> PolarsResult<()> {
        let df = df!(
            "i" => &[1_i64, 2],
            "f" => &[1.5_f64, 2.5],
            "s" => &["a", "b"],
            "b" => &[true, false]
        )?;
        let table = Table::new(df);
        let kinds: Vec<ColumnKind> = table.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Float,
                ColumnKind::Text,
                ColumnKind::Boolean
            ]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 4);
        Ok(())
    }

    #[test]
    fn missing_counts_nulls_and_float_nans() -> PolarsResult<()> {
        let df = df!(
            "f" => &[Some(1.0_f64), None, Some(f64::NAN)],
            "s" => &[Some("a"), None, None]
        )?;
        let table = Table::new(df);
        assert_eq!(table.missing_in("f")?, 2);
        assert_eq!(table.missing_in("s")?, 2);
        assert_eq!(table.missing_count()?, 4);
        Ok(())
    }

    #[test]
    fn empty_table_has_no_rows() {
        let table = Table::empty();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn cell_text_renders_nulls_blank() -> PolarsResult<()> {
        let table = Table::new(df!("s" => &[Some("x"), None], "n" => &[Some(3_i64), None])?);
        assert_eq!(table.cell_text("s", 0)?, "x");
        assert_eq!(table.cell_text("s", 1)?, "");
        assert_eq!(table.cell_text("n", 0)?, "3");
        Ok(())
    }
}
