//! Turn a validated chart spec into plottable data: xy series, box statistics or histogram bins.

use crate::chart_config::{ChartKind, ChartSpec};
use crate::error::RenderError;
use crate::statistics::quantile_sorted;
use crate::table::Table;
use polars::prelude::*;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// How x positions map to axis labels.
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    Numeric,
    /// x = index into the labels (first-appearance order)
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XySeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyData {
    pub kind: ChartKind,
    pub x_axis: XAxis,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<XySeries>,
}

/// Five-number summary of one box, with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlotStats {
    pub label: String,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlotData {
    pub x_label: Option<String>,
    pub y_label: String,
    pub stats: Vec<BoxPlotStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub name: String,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramData {
    pub x_label: String,
    /// `bins + 1` ascending edges shared by every series
    pub edges: Vec<f64>,
    pub series: Vec<HistogramSeries>,
}

impl HistogramData {
    pub fn max_count(&self) -> u64 {
        self.series
            .iter()
            .flat_map(|s| s.counts.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Xy(XyData),
    Box(BoxPlotData),
    Histogram(HistogramData),
}

pub fn prepare(table: &Table, spec: &ChartSpec) -> Result<ChartData, RenderError> {
    prepare_with_bins(table, spec, DEFAULT_HISTOGRAM_BINS)
}

/// Like [`prepare`] with an explicit histogram bin count. Rows with a null in any bound column are dropped.
pub fn prepare_with_bins(
    table: &Table,
    spec: &ChartSpec,
    bins: usize,
) -> Result<ChartData, RenderError> {
    match spec.kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Scatter => xy_data(table, spec).map(ChartData::Xy),
        ChartKind::Box => box_data(table, spec).map(ChartData::Box),
        ChartKind::Histogram => histogram_data(table, spec, bins.max(1)).map(ChartData::Histogram),
    }
}

fn required<'a>(column: &'a Option<String>, role: &'static str, spec: &ChartSpec) -> Result<&'a str, RenderError> {
    column.as_deref().ok_or(RenderError::MissingRole {
        kind: spec.kind.as_str(),
        role,
    })
}

/// Column as f64 with nulls and NaN as `None`.
pub(crate) fn numeric_values(table: &Table, column: &str) -> PolarsResult<Vec<Option<f64>>> {
    let values = table.frame().column(column)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Column rendered as text with nulls as `None`.
pub(crate) fn text_values(table: &Table, column: &str) -> PolarsResult<Vec<Option<String>>> {
    let values = table.frame().column(column)?.cast(&DataType::String)?;
    Ok(values
        .str()?
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Distinct labels in first-appearance order and each row's index into them.
fn ordinal(values: &[Option<String>]) -> (Vec<String>, Vec<Option<usize>>) {
    let mut labels: Vec<String> = Vec::new();
    let positions = values
        .iter()
        .map(|v| {
            v.as_ref().map(|s| match labels.iter().position(|l| l == s) {
                Some(i) => i,
                None => {
                    labels.push(s.clone());
                    labels.len() - 1
                }
            })
        })
        .collect();
    (labels, positions)
}

/// Group index per row (all rows in group 0 when there is no color column).
fn color_groups(
    table: &Table,
    color: Option<&str>,
    fallback: &str,
) -> PolarsResult<(Vec<String>, Vec<Option<usize>>)> {
    match color {
        Some(column) => Ok(ordinal(&text_values(table, column)?)),
        None => Ok((vec![fallback.to_string()], vec![Some(0); table.row_count()])),
    }
}

fn no_rows() -> RenderError {
    RenderError::Data("no rows have values for the selected columns".to_string())
}

fn xy_data(table: &Table, spec: &ChartSpec) -> Result<XyData, RenderError> {
    let x = required(&spec.x, "x", spec)?;
    let y = required(&spec.y, "y", spec)?;

    let numeric_x = table.column_kind(x).is_some_and(|k| k.is_numeric());
    let (x_axis, xs) = if numeric_x {
        (XAxis::Numeric, numeric_values(table, x)?)
    } else {
        let (labels, positions) = ordinal(&text_values(table, x)?);
        let xs = positions.into_iter().map(|p| p.map(|i| i as f64)).collect();
        (XAxis::Categorical(labels), xs)
    };
    let ys = numeric_values(table, y)?;
    let (names, groups) = color_groups(table, spec.color.as_deref(), y)?;

    let mut series: Vec<XySeries> = names
        .into_iter()
        .map(|name| XySeries {
            name,
            points: Vec::new(),
        })
        .collect();
    for ((x, y), group) in xs.iter().zip(&ys).zip(&groups) {
        if let (Some(x), Some(y), Some(g)) = (x, y, group) {
            series[*g].points.push((*x, *y));
        }
    }
    series.retain(|s| !s.points.is_empty());
    if series.is_empty() {
        return Err(no_rows());
    }

    for s in &mut series {
        match spec.kind {
            ChartKind::Line => s.points.sort_by(|a, b| a.0.total_cmp(&b.0)),
            // Bars at the same x within one series are summed.
            ChartKind::Bar => s.points = sum_by_x(&s.points),
            _ => {}
        }
    }

    Ok(XyData {
        kind: spec.kind,
        x_axis,
        x_label: x.to_string(),
        y_label: y.to_string(),
        series,
    })
}

fn sum_by_x(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut summed: Vec<(f64, f64)> = Vec::new();
    for &(x, y) in points {
        match summed.iter_mut().find(|(sx, _)| *sx == x) {
            Some(entry) => entry.1 += y,
            None => summed.push((x, y)),
        }
    }
    summed
}

fn box_data(table: &Table, spec: &ChartSpec) -> Result<BoxPlotData, RenderError> {
    let y = required(&spec.y, "y", spec)?;
    let ys = numeric_values(table, y)?;
    let (labels, groups) = color_groups(table, spec.x.as_deref(), y)?;

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); labels.len()];
    for (v, g) in ys.iter().zip(&groups) {
        if let (Some(v), Some(g)) = (v, g) {
            values[*g].push(*v);
        }
    }

    let stats: Vec<BoxPlotStats> = labels
        .into_iter()
        .zip(values)
        .filter_map(|(label, mut vals)| {
            vals.sort_by(f64::total_cmp);
            box_stats(label, &vals)
        })
        .collect();
    if stats.is_empty() {
        return Err(no_rows());
    }

    Ok(BoxPlotData {
        x_label: spec.x.clone(),
        y_label: y.to_string(),
        stats,
    })
}

/// Stats of sorted values; `None` when empty.
fn box_stats(label: String, sorted: &[f64]) -> Option<BoxPlotStats> {
    let q1 = quantile_sorted(sorted, 0.25)?;
    let median = quantile_sorted(sorted, 0.5)?;
    let q3 = quantile_sorted(sorted, 0.75)?;
    let iqr = q3 - q1;
    let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside = || sorted.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
    let lower_whisker = inside().next().unwrap_or(q1);
    let upper_whisker = inside().last().unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| !(low_fence..=high_fence).contains(v))
        .collect();

    Some(BoxPlotStats {
        label,
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

fn histogram_data(table: &Table, spec: &ChartSpec, bins: usize) -> Result<HistogramData, RenderError> {
    let x = required(&spec.x, "x", spec)?;
    let xs = numeric_values(table, x)?;
    let (names, groups) = color_groups(table, spec.color.as_deref(), x)?;

    let present = xs.iter().zip(&groups).filter_map(|(v, g)| Some((v.as_ref()?, g.as_ref()?)));
    let (min, max) = present
        .clone()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (v, _)| {
            (lo.min(*v), hi.max(*v))
        });
    if !min.is_finite() || !max.is_finite() {
        return Err(no_rows());
    }
    let (start, end) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (end - start) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| start + width * i as f64).collect();

    let mut series: Vec<HistogramSeries> = names
        .into_iter()
        .map(|name| HistogramSeries {
            name,
            counts: vec![0; bins],
        })
        .collect();
    for (v, g) in present {
        // The last bin is closed on the right.
        let bin = (((v - start) / width).floor() as usize).min(bins - 1);
        series[*g].counts[bin] += 1;
    }
    series.retain(|s| s.counts.iter().any(|c| *c > 0));

    Ok(HistogramData {
        x_label: x.to_string(),
        edges,
        series,
    })
}
