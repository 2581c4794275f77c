//! Draw prepared chart data to SVG with plotters, and the chart panel that owns the last good chart.

use color_eyre::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, warn};

use crate::chart_config::{ChartKind, ChartSpec, RoleSelection};
use crate::chart_data::{
    prepare_with_bins, BoxPlotData, ChartData, HistogramData, XAxis, XyData,
    DEFAULT_HISTOGRAM_BINS,
};
use crate::classify::ColumnClasses;
use crate::config::ChartConfig;
use crate::error::RenderError;
use crate::statistics::CorrelationHeatmap;
use crate::table::Table;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Plotly's default qualitative palette.
const PALETTE: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

fn series_color(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Format an axis tick compactly.
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else if (v - v.round()).abs() < 1e-9 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Label at an ordinal position; blank between positions.
fn ordinal_label(labels: &[String], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max > min {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    } else {
        (min - 0.5, max + 0.5)
    }
}

fn draw_error(e: color_eyre::Report) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Render prepared data to an SVG document.
pub fn render_svg(data: &ChartData, spec: &ChartSpec, size: (u32, u32)) -> Result<String, RenderError> {
    let title = spec.title();
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        let drawn = match data {
            ChartData::Xy(xy) => draw_xy(&root, xy, &title),
            ChartData::Box(b) => draw_box(&root, b, &title),
            ChartData::Histogram(h) => draw_histogram(&root, h, &title),
        };
        drawn.map_err(draw_error)?;
    }
    Ok(svg)
}

/// Render a correlation heat map to an SVG document.
pub fn render_heatmap_svg(heatmap: &CorrelationHeatmap, size: (u32, u32)) -> Result<String, RenderError> {
    if heatmap.labels.is_empty() {
        return Err(RenderError::Data("correlation matrix is empty".to_string()));
    }
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_heatmap(&root, heatmap).map_err(draw_error)?;
    }
    Ok(svg)
}

fn draw_xy(root: &Area<'_>, data: &XyData, title: &str) -> Result<()> {
    root.fill(&WHITE)?;

    let points = || data.series.iter().flat_map(|s| s.points.iter());
    let (x_min, x_max) = match &data.x_axis {
        XAxis::Categorical(labels) => (-0.5, labels.len().max(1) as f64 - 0.5),
        XAxis::Numeric => {
            let (lo, hi) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.0), hi.max(p.0))
            });
            if data.kind == ChartKind::Bar {
                let (lo, hi) = padded(lo, hi);
                (lo - 0.5, hi + 0.5)
            } else {
                padded(lo, hi)
            }
        }
    };
    let (y_lo, y_hi) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.1), hi.max(p.1))
    });
    let (y_min, y_max) = if data.kind == ChartKind::Bar {
        padded(y_lo.min(0.0), y_hi.max(0.0))
    } else {
        padded(y_lo, y_hi)
    };

    let mut chart = ChartBuilder::on(root)
        .margin(30)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let x_formatter = |v: &f64| match &data.x_axis {
        XAxis::Categorical(labels) => ordinal_label(labels, *v),
        XAxis::Numeric => format_axis_label(*v),
    };
    let y_formatter = |v: &f64| format_axis_label(*v);
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(data.x_label.as_str())
        .y_desc(data.y_label.as_str())
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter);
    if let XAxis::Categorical(labels) = &data.x_axis {
        mesh.x_labels(labels.len().max(1));
    }
    mesh.draw()?;

    let group_width = 0.8;
    let bar_width = group_width / data.series.len().max(1) as f64;
    for (idx, s) in data.series.iter().enumerate() {
        let color = series_color(idx);
        let legend = move |(x, y): (i32, i32)| PathElement::new(vec![(x, y), (x + 20, y)], color);
        match data.kind {
            ChartKind::Line => {
                chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color))?
                    .label(s.name.as_str())
                    .legend(legend);
                chart.draw_series(
                    s.points
                        .iter()
                        .map(|&p| Circle::new(p, 3, color.filled())),
                )?;
            }
            ChartKind::Scatter => {
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|&p| Circle::new(p, 3, color.filled())),
                    )?
                    .label(s.name.as_str())
                    .legend(legend);
            }
            _ => {
                let offset = -group_width / 2.0 + bar_width * idx as f64;
                chart
                    .draw_series(s.points.iter().map(|&(x, y)| {
                        let x0 = x + offset;
                        Rectangle::new([(x0, 0.0), (x0 + bar_width, y)], color.filled())
                    }))?
                    .label(s.name.as_str())
                    .legend(legend);
            }
        }
    }

    if data.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_box(root: &Area<'_>, data: &BoxPlotData, title: &str) -> Result<()> {
    root.fill(&WHITE)?;

    let (lo, hi) = data
        .stats
        .iter()
        .flat_map(|s| s.outliers.iter().copied().chain([s.lower_whisker, s.upper_whisker]))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (y_min, y_max) = padded(lo, hi);
    let x_min = -0.5;
    let x_max = data.stats.len().max(1) as f64 - 0.5;

    let mut chart = ChartBuilder::on(root)
        .margin(30)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let labels: Vec<String> = data.stats.iter().map(|s| s.label.clone()).collect();
    chart
        .configure_mesh()
        .x_labels(labels.len())
        .x_desc(data.x_label.as_deref().unwrap_or(""))
        .y_desc(data.y_label.as_str())
        .x_label_formatter(&|v| ordinal_label(&labels, *v))
        .y_label_formatter(&|v| format_axis_label(*v))
        .draw()?;

    let box_half = 0.3;
    let cap_half = 0.15;
    for (idx, stat) in data.stats.iter().enumerate() {
        let x = idx as f64;
        let color = series_color(idx);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - box_half, stat.q1), (x + box_half, stat.q3)],
            color.mix(0.3).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - box_half, stat.q1), (x + box_half, stat.q3)],
            ShapeStyle::from(&color).stroke_width(1),
        )))?;
        chart.draw_series(
            [
                vec![(x - box_half, stat.median), (x + box_half, stat.median)],
                vec![(x, stat.lower_whisker), (x, stat.q1)],
                vec![(x, stat.q3), (x, stat.upper_whisker)],
                vec![(x - cap_half, stat.lower_whisker), (x + cap_half, stat.lower_whisker)],
                vec![(x - cap_half, stat.upper_whisker), (x + cap_half, stat.upper_whisker)],
            ]
            .into_iter()
            .map(|path| PathElement::new(path, color)),
        )?;
        chart.draw_series(
            stat.outliers
                .iter()
                .map(|&v| Circle::new((x, v), 3, color.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

fn draw_histogram(root: &Area<'_>, data: &HistogramData, title: &str) -> Result<()> {
    root.fill(&WHITE)?;

    let x_min = data.edges.first().copied().unwrap_or(0.0);
    let x_max = data.edges.last().copied().unwrap_or(1.0);
    let bins = data.edges.len().saturating_sub(1);
    // Series are stacked, so the y range covers the tallest stack.
    let stack_max = (0..bins)
        .map(|b| data.series.iter().map(|s| s.counts[b]).sum::<u64>())
        .max()
        .unwrap_or(0);

    let mut chart = ChartBuilder::on(root)
        .margin(30)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..(stack_max.max(1) as f64 * 1.05))?;

    chart
        .configure_mesh()
        .x_desc(data.x_label.as_str())
        .y_desc("count")
        .x_label_formatter(&|v| format_axis_label(*v))
        .y_label_formatter(&|v| format_axis_label(*v))
        .draw()?;

    let mut base = vec![0u64; bins];
    for (idx, s) in data.series.iter().enumerate() {
        let color = series_color(idx);
        let bars: Vec<Rectangle<(f64, f64)>> = (0..bins)
            .filter(|&b| s.counts[b] > 0)
            .map(|b| {
                let y0 = base[b] as f64;
                let y1 = (base[b] + s.counts[b]) as f64;
                Rectangle::new(
                    [(data.edges[b], y0), (data.edges[b + 1], y1)],
                    color.filled(),
                )
            })
            .collect();
        for (b, count) in s.counts.iter().enumerate() {
            base[b] += count;
        }
        chart
            .draw_series(bars)?
            .label(s.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if data.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_heatmap(root: &Area<'_>, heatmap: &CorrelationHeatmap) -> Result<()> {
    root.fill(&WHITE)?;

    let n = heatmap.labels.len();
    let extent = n as f64 - 0.5;
    let mut chart = ChartBuilder::on(root)
        .margin(30)
        .caption("Correlation Matrix", ("sans-serif", 20))
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(-0.5..extent, -0.5..extent)?;

    let labels = &heatmap.labels;
    // Row 0 is drawn at the top.
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|v| ordinal_label(labels, *v))
        .y_label_formatter(&|v| ordinal_label(labels, (n - 1) as f64 - *v))
        .draw()?;

    chart.draw_series(heatmap.cells.iter().map(|cell| {
        let x = cell.col as f64;
        let y = (n - 1 - cell.row) as f64;
        let (r, g, b) = cell.color;
        Rectangle::new(
            [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
            RGBColor(r, g, b).filled(),
        )
    }))?;

    chart.draw_series(heatmap.cells.iter().filter(|c| !c.text.is_empty()).map(|cell| {
        let x = cell.col as f64;
        let y = (n - 1 - cell.row) as f64;
        // Dark text on light cells, light text on saturated ones.
        let strong = cell.value.is_some_and(|v| v.abs() > 0.6);
        let color = if strong { WHITE } else { BLACK };
        Text::new(
            cell.text.clone(),
            (x, y),
            ("sans-serif", 14)
                .into_font()
                .color(&color)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;

    root.present()?;
    Ok(())
}

/// A successfully drawn chart.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub spec: ChartSpec,
    pub svg: String,
}

/// Result of one chart panel render. Errors never leave the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Rendered(RenderedChart),
    /// The table has no numeric columns; no chart kind is offered.
    NoNumericColumns,
    Failed { message: String },
}

/// The visualization view. Keeps the last chart that rendered successfully.
#[derive(Debug, Clone)]
pub struct ChartPanel {
    size: (u32, u32),
    bins: usize,
    last: Option<RenderedChart>,
}

impl Default for ChartPanel {
    fn default() -> Self {
        Self::new(&ChartConfig::default())
    }
}

impl ChartPanel {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            size: (config.width, config.height),
            bins: config.histogram_bins.max(1),
            last: None,
        }
    }

    /// Panel of the given size with [`DEFAULT_HISTOGRAM_BINS`].
    pub fn with_size(size: (u32, u32)) -> Self {
        Self {
            size,
            bins: DEFAULT_HISTOGRAM_BINS,
            last: None,
        }
    }

    pub fn render(
        &mut self,
        table: &Table,
        classes: &ColumnClasses,
        kind: ChartKind,
        selection: &RoleSelection,
    ) -> ChartOutcome {
        match self.try_render(table, classes, kind, selection) {
            Ok(chart) => {
                debug!(kind = kind.as_str(), bytes = chart.svg.len(), "chart rendered");
                self.last = Some(chart.clone());
                ChartOutcome::Rendered(chart)
            }
            Err(RenderError::NoNumericColumns) => {
                warn!("chart refused: no numeric columns");
                ChartOutcome::NoNumericColumns
            }
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "chart failed");
                ChartOutcome::Failed {
                    message: format!("Error generating chart: {}", e),
                }
            }
        }
    }

    fn try_render(
        &self,
        table: &Table,
        classes: &ColumnClasses,
        kind: ChartKind,
        selection: &RoleSelection,
    ) -> Result<RenderedChart, RenderError> {
        if !classes.has_numeric() {
            return Err(RenderError::NoNumericColumns);
        }
        let domains = kind.role_domains(classes, &table.column_names());
        let spec = selection.validate(kind, &domains)?;
        let data = prepare_with_bins(table, &spec, self.bins)?;
        let svg = render_svg(&data, &spec, self.size)?;
        Ok(RenderedChart { spec, svg })
    }

    pub fn last_rendered(&self) -> Option<&RenderedChart> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_config::default_selection;
    use polars::prelude::*;

    fn sales() -> Table {
        Table::new(
            df!(
                "date" => &["2024-01-01", "2024-01-02", "2024-01-03"],
                "category" => &["A", "B", "A"],
                "value" => &[100_i64, 150, 120],
                "ratio" => &[0.5_f64, 0.7, 0.4]
            )
            .unwrap(),
        )
    }

    // Font discovery depends on the host; a draw error is acceptable, a panic is not.
    fn assert_svg_or_draw_error(result: Result<String, RenderError>) {
        match result {
            Ok(svg) => assert!(svg.contains("<svg")),
            Err(RenderError::Draw(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn every_kind_renders_with_defaults() {
        let table = sales();
        let classes = ColumnClasses::of(&table);
        for kind in ChartKind::ALL {
            let domains = kind.role_domains(&classes, &table.column_names());
            let spec = default_selection(&domains).validate(kind, &domains).unwrap();
            let data = prepare_with_bins(&table, &spec, 5).unwrap();
            assert_svg_or_draw_error(render_svg(&data, &spec, (400, 300)));
        }
    }

    #[test]
    fn heatmap_renders() {
        let table = sales();
        let classes = ColumnClasses::of(&table);
        let matrix = crate::statistics::CorrelationMatrix::compute(&table, &classes.numeric).unwrap();
        let heatmap = CorrelationHeatmap::from_matrix(&matrix);
        assert_svg_or_draw_error(render_heatmap_svg(&heatmap, (400, 400)));
    }

    #[test]
    fn panel_refuses_tables_without_numeric_columns() {
        let table = Table::new(df!("s" => &["a", "b"]).unwrap());
        let mut panel = ChartPanel::default();
        let outcome = panel.render(
            &table,
            &ColumnClasses::of(&table),
            ChartKind::Histogram,
            &RoleSelection::default(),
        );
        assert_eq!(outcome, ChartOutcome::NoNumericColumns);
        assert!(panel.last_rendered().is_none());

        let err = panel
            .try_render(
                &table,
                &ColumnClasses::of(&table),
                ChartKind::Bar,
                &RoleSelection::default(),
            )
            .unwrap_err();
        assert_eq!(err, RenderError::NoNumericColumns);
        assert_eq!(err.to_string(), "No numeric columns found for visualization");
    }

    #[test]
    fn panel_failure_keeps_previous_chart() {
        let table = sales();
        let classes = ColumnClasses::of(&table);
        let mut panel = ChartPanel::with_size((400, 300));
        let good = RoleSelection {
            x: Some("ratio".into()),
            y: Some("value".into()),
            color: None,
        };
        let first = panel.render(&table, &classes, ChartKind::Scatter, &good);

        let bad = RoleSelection {
            x: Some("category".into()),
            ..good
        };
        let outcome = panel.render(&table, &classes, ChartKind::Scatter, &bad);
        let ChartOutcome::Failed { message } = outcome else {
            panic!("expected failure")
        };
        assert!(message.starts_with("Error generating chart:"));

        match first {
            ChartOutcome::Rendered(chart) => assert_eq!(panel.last_rendered(), Some(&chart)),
            ChartOutcome::Failed { .. } => assert!(panel.last_rendered().is_none()),
            ChartOutcome::NoNumericColumns => panic!("table has numeric columns"),
        }
    }

    #[test]
    fn categorical_labels_only_on_positions() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ordinal_label(&labels, 1.0), "b");
        assert_eq!(ordinal_label(&labels, 0.5), "");
        assert_eq!(ordinal_label(&labels, 2.0), "");
        assert_eq!(ordinal_label(&labels, -1.0), "");
    }
}
