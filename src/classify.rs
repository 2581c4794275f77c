//! Numeric / categorical partition of a table's columns.

use crate::table::{ColumnKind, Table};

/// Disjoint, order-preserving column lists. Dates, booleans and other kinds are in neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClasses {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnClasses {
    pub fn of(table: &Table) -> Self {
        let mut classes = Self::default();
        for column in table.columns() {
            match column.kind {
                ColumnKind::Integer | ColumnKind::Float => classes.numeric.push(column.name),
                ColumnKind::Text => classes.categorical.push(column.name),
                ColumnKind::Date | ColumnKind::Boolean | ColumnKind::Other => {}
            }
        }
        classes
    }

    pub fn has_numeric(&self) -> bool {
        !self.numeric.is_empty()
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|c| c == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn partitions_are_disjoint_and_ordered() {
        let df = df!(
            "date" => &["2024-01-01", "2024-01-02"],
            "category" => &["A", "B"],
            "value" => &[100_i64, 150],
            "ratio" => &[0.5_f64, 0.75],
            "flag" => &[true, false]
        )
        .unwrap();
        let table = Table::new(df);
        let classes = ColumnClasses::of(&table);
        assert_eq!(classes.numeric, vec!["value", "ratio"]);
        assert_eq!(classes.categorical, vec!["date", "category"]);
        assert!(classes
            .numeric
            .iter()
            .all(|c| !classes.categorical.contains(c)));
        assert!(!classes.is_numeric("flag") && !classes.is_categorical("flag"));
    }

    #[test]
    fn parsed_dates_belong_to_neither_list() {
        // 2024-01-01 and 2024-01-02 as days since the epoch
        let dates = Series::new("d".into(), &[19_723_i32, 19_724])
            .cast(&DataType::Date)
            .unwrap();
        let df = DataFrame::new(vec![dates.into(), Series::new("v".into(), &[1_i64, 2]).into()])
            .unwrap();
        let classes = ColumnClasses::of(&Table::new(df));
        assert_eq!(classes.numeric, vec!["v"]);
        assert!(classes.categorical.is_empty());
    }
}
