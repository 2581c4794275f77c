//! Descriptive statistics, correlation and missing-value reporting for the current table.

use crate::chart_data::numeric_values;
use crate::classify::ColumnClasses;
use crate::notice::Notice;
use crate::table::Table;
use polars::prelude::*;

/// Row labels of a describe table, top to bottom.
pub const DESCRIBE_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Quantile of ascending values with linear interpolation between closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Summary of one numeric column. Values that need more data than is present are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    /// Non-missing values
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator)
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    pub fn from_values(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let mean = (n > 0).then(|| sorted.iter().sum::<f64>() / n as f64);
        let std = mean.filter(|_| n > 1).map(|m| {
            let ss: f64 = sorted.iter().map(|v| (v - m).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        Self {
            name: name.into(),
            count: n,
            mean,
            std,
            min: sorted.first().copied(),
            q25: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q75: quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }

    /// Value in [`DESCRIBE_ROWS`] order.
    pub fn row(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.count as f64),
            1 => self.mean,
            2 => self.std,
            3 => self.min,
            4 => self.q25,
            5 => self.median,
            6 => self.q75,
            7 => self.max,
            _ => None,
        }
    }
}

/// One summary per numeric column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeTable {
    pub columns: Vec<ColumnSummary>,
}

impl DescribeTable {
    pub fn compute(table: &Table, numeric: &[String]) -> PolarsResult<Self> {
        let columns = numeric
            .iter()
            .map(|name| Ok(ColumnSummary::from_values(name, &numeric_values(table, name)?)))
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Frame with a `statistic` label column and one column per summarized column.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Series::new("statistic".into(), DESCRIBE_ROWS.to_vec()).into());
        for summary in &self.columns {
            let values: Vec<Option<f64>> = (0..DESCRIBE_ROWS.len()).map(|i| summary.row(i)).collect();
            columns.push(Series::new(summary.name.as_str().into(), values).into());
        }
        DataFrame::new(columns)
    }
}

/// Pearson correlation over rows where both values are present.
/// `None` with fewer than two such rows or when either side has zero variance.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        numerator += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((numerator / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Symmetric correlation matrix; the diagonal is 1 wherever the column has variance.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(table: &Table, numeric: &[String]) -> PolarsResult<Self> {
        let data = numeric
            .iter()
            .map(|name| numeric_values(table, name))
            .collect::<PolarsResult<Vec<_>>>()?;

        let n = numeric.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let r = pearson(&data[i], &data[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Ok(Self {
            columns: numeric.to_vec(),
            values,
        })
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Colorbrewer RdBu stops, reversed so that -1 is blue and +1 is red.
const RDBU_R: [(u8, u8, u8); 11] = [
    (5, 48, 97),
    (33, 102, 172),
    (67, 147, 195),
    (146, 197, 222),
    (209, 229, 240),
    (247, 247, 247),
    (253, 219, 199),
    (244, 165, 130),
    (214, 96, 77),
    (178, 24, 43),
    (103, 0, 31),
];

/// Color for `value` on a diverging red/blue scale over `[z_min, z_max]`.
pub fn diverging_color(value: f64, z_min: f64, z_max: f64) -> (u8, u8, u8) {
    let span = (z_max - z_min).max(f64::EPSILON);
    let t = ((value - z_min) / span).clamp(0.0, 1.0) * (RDBU_R.len() - 1) as f64;
    let lower = t.floor() as usize;
    let upper = (lower + 1).min(RDBU_R.len() - 1);
    let frac = t - lower as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (RDBU_R[lower], RDBU_R[upper]);
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub row: usize,
    pub col: usize,
    pub value: Option<f64>,
    /// Annotation drawn in the cell; blank when undefined
    pub text: String,
    pub color: (u8, u8, u8),
}

/// Correlation matrix laid out for drawing: fixed z range, annotations and colors.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationHeatmap {
    pub labels: Vec<String>,
    pub cells: Vec<HeatmapCell>,
    pub z_min: f64,
    pub z_max: f64,
}

/// Fill for cells without a defined correlation.
pub const UNDEFINED_CELL_COLOR: (u8, u8, u8) = (220, 220, 220);

impl CorrelationHeatmap {
    pub fn from_matrix(matrix: &CorrelationMatrix) -> Self {
        let (z_min, z_max) = (-1.0, 1.0);
        let cells = matrix
            .values
            .iter()
            .enumerate()
            .flat_map(|(row, values)| {
                values.iter().enumerate().map(move |(col, value)| HeatmapCell {
                    row,
                    col,
                    value: *value,
                    text: value.map(|v| format!("{:.2}", v)).unwrap_or_default(),
                    color: value
                        .map(|v| diverging_color(v, z_min, z_max))
                        .unwrap_or(UNDEFINED_CELL_COLOR),
                })
            })
            .collect();

        Self {
            labels: matrix.columns.clone(),
            cells,
            z_min,
            z_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingColumn {
    pub name: String,
    pub count: usize,
    /// Percent of rows, rounded to two decimals
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissingReport {
    /// Columns with at least one missing value, in column order
    Columns(Vec<MissingColumn>),
    NoneMissing,
}

impl MissingReport {
    pub fn compute(table: &Table) -> PolarsResult<Self> {
        let rows = table.row_count();
        let mut columns = Vec::new();
        for name in table.column_names() {
            let count = table.missing_in(&name)?;
            if count == 0 {
                continue;
            }
            let percentage = if rows == 0 {
                0.0
            } else {
                (count as f64 / rows as f64 * 100.0 * 100.0).round() / 100.0
            };
            columns.push(MissingColumn {
                name,
                count,
                percentage,
            });
        }

        Ok(if columns.is_empty() {
            Self::NoneMissing
        } else {
            Self::Columns(columns)
        })
    }

    pub fn total(&self) -> usize {
        match self {
            Self::Columns(columns) => columns.iter().map(|c| c.count).sum(),
            Self::NoneMissing => 0,
        }
    }
}

/// Everything the statistics view shows for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    /// Absent when the table has no numeric columns
    pub describe: Option<DescribeTable>,
    /// Present with two or more numeric columns
    pub correlation: Option<CorrelationHeatmap>,
    pub missing: MissingReport,
}

impl StatisticsReport {
    pub fn compute(table: &Table, classes: &ColumnClasses) -> PolarsResult<Self> {
        let describe = if classes.has_numeric() {
            Some(DescribeTable::compute(table, &classes.numeric)?)
        } else {
            None
        };
        let correlation = if classes.numeric.len() > 1 {
            let matrix = CorrelationMatrix::compute(table, &classes.numeric)?;
            Some(CorrelationHeatmap::from_matrix(&matrix))
        } else {
            None
        };

        Ok(Self {
            describe,
            correlation,
            missing: MissingReport::compute(table)?,
        })
    }

    /// Status lines shown alongside the report.
    pub fn notices(&self) -> Vec<Notice> {
        let mut notices = Vec::new();
        if self.describe.is_none() {
            notices.push(Notice::info(
                "No numeric columns available for statistical analysis",
            ));
        }
        if self.missing == MissingReport::NoneMissing {
            notices.push(Notice::success("No missing values found!"));
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&v, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&v, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&v, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn summary_skips_missing_values() {
        let s = ColumnSummary::from_values("v", &[Some(100.0), None, Some(150.0)]);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, Some(125.0));
        assert_eq!(s.min, Some(100.0));
        assert_eq!(s.max, Some(150.0));
        let std = s.std.unwrap();
        assert!((std - 35.355_339).abs() < 1e-5);
    }

    #[test]
    fn single_value_has_no_std() {
        let s = ColumnSummary::from_values("v", &[Some(1.0)]);
        assert_eq!(s.std, None);
        assert_eq!(s.median, Some(1.0));
        let empty = ColumnSummary::from_values("v", &[None]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);
    }

    #[test]
    fn pearson_uses_pairwise_complete_rows() {
        let a = [Some(1.0), Some(2.0), Some(3.0), None];
        let b = [Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        let c = [Some(3.0), Some(2.0), Some(1.0), Some(0.0)];
        assert!((pearson(&a, &c).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[Some(1.0), Some(1.0)], &[Some(1.0), Some(2.0)]), None);
        assert_eq!(pearson(&[Some(1.0)], &[Some(1.0)]), None);
    }

    #[test]
    fn heatmap_colors_run_blue_to_red() {
        assert_eq!(diverging_color(-1.0, -1.0, 1.0), (5, 48, 97));
        assert_eq!(diverging_color(0.0, -1.0, 1.0), (247, 247, 247));
        assert_eq!(diverging_color(1.0, -1.0, 1.0), (103, 0, 31));
    }

    #[test]
    fn missing_report_sums_to_table_total() {
        let table = Table::new(
            df!(
                "a" => &[Some(1.0_f64), None, Some(f64::NAN), Some(4.0)],
                "b" => &[Some("x"), Some("y"), None, Some("z")],
                "c" => &[1_i64, 2, 3, 4]
            )
            .unwrap(),
        );
        let report = MissingReport::compute(&table).unwrap();
        let MissingReport::Columns(columns) = &report else {
            panic!("expected missing columns")
        };
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].count, 2);
        assert_eq!(columns[0].percentage, 50.0);
        assert_eq!(columns[1].percentage, 25.0);
        assert_eq!(report.total(), table.missing_count().unwrap());
    }

    #[test]
    fn report_without_numeric_columns_still_has_missing() {
        let table = Table::new(df!("s" => &[Some("a"), None, None]).unwrap());
        let report = StatisticsReport::compute(&table, &ColumnClasses::of(&table)).unwrap();
        assert!(report.describe.is_none());
        assert!(report.correlation.is_none());
        let MissingReport::Columns(columns) = report.missing else {
            panic!("expected missing columns")
        };
        assert_eq!(columns[0].percentage, 66.67);
    }
}
