use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use datadash::error_display::user_message_from_io;
use datadash::export::ExportBundle;
use datadash::statistics::MissingReport;
use datadash::{
    default_selection, AppConfig, ChartKind, ChartOutcome, ConfigManager, Dashboard,
    DashboardEvent, RenderError, RowFilter, SqlWarehouse, ViewError, APP_NAME,
};
use datadash_cli::{Args, ChartKindArg, SourceCommand};
use std::path::{Path, PathBuf};

fn chart_kind(arg: ChartKindArg) -> ChartKind {
    match arg {
        ChartKindArg::Bar => ChartKind::Bar,
        ChartKindArg::Line => ChartKind::Line,
        ChartKindArg::Scatter => ChartKind::Scatter,
        ChartKindArg::Box => ChartKind::Box,
        ChartKindArg::Histogram => ChartKind::Histogram,
    }
}

/// Apply command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(delimiter) = args.delimiter {
        config.file_loading.delimiter = Some(delimiter);
    }
    if let Some(parse_dates) = args.parse_dates {
        config.file_loading.parse_dates = parse_dates;
    }
    if let Some(timeout) = args.timeout_secs {
        config.api.timeout_secs = timeout;
    }
    if let Some(dir) = &args.output_dir {
        config.export.output_dir = Some(dir.clone());
    }
    if let Some(rows) = args.preview_rows {
        config.export.preview_rows = rows;
    }
}

fn source_events(source: &SourceCommand) -> Result<Vec<DashboardEvent>> {
    let events = match source {
        SourceCommand::Upload { path } => {
            let bytes = std::fs::read(path).map_err(|e| {
                eyre!(user_message_from_io(&e, Some(&path.display().to_string())))
            })?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            vec![DashboardEvent::Upload { filename, bytes }]
        }
        SourceCommand::Query { sql } => vec![
            DashboardEvent::QueryEdited(sql.clone()),
            DashboardEvent::ExecuteQuery,
        ],
        SourceCommand::Fetch { url } => vec![
            DashboardEvent::EndpointEdited(url.clone()),
            DashboardEvent::FetchApi,
        ],
    };
    Ok(events)
}

fn print_overview(dashboard: &Dashboard) -> Result<(), ViewError> {
    let info = dashboard.dataset_info()?;
    println!("Total Rows: {}", info.rows);
    println!("Total Columns: {}", info.columns);
    println!("Numeric Columns: {}", info.numeric);
    println!("Categorical Columns: {}", info.categorical);
    if let Some(filename) = &info.filename {
        println!("File: {}", filename);
    }
    println!();
    println!("{}", dashboard.preview()?.frame());
    Ok(())
}

fn print_statistics(dashboard: &Dashboard, out_dir: &Path) -> Result<()> {
    let report = dashboard.statistics()?;
    for notice in report.notices() {
        println!("{}", notice);
    }
    if let Some(describe) = &report.describe {
        println!("Descriptive Statistics");
        println!("{}", describe.to_frame()?);
    }
    match dashboard.correlation_svg(&report) {
        Some(Ok(svg)) => {
            let path = write_file(out_dir, "correlation_heatmap.svg", svg.as_bytes())?;
            println!("Correlation heat map: {}", path.display());
        }
        Some(Err(e)) => eprintln!("Error generating chart: {}", e),
        None => {}
    }
    if let MissingReport::Columns(columns) = &report.missing {
        println!("Missing Values");
        for column in columns {
            println!(
                "  {}: {} ({:.2}%)",
                column.name, column.count, column.percentage
            );
        }
    }
    Ok(())
}

fn render_chart(
    dashboard: &mut Dashboard,
    args: &Args,
    kind: ChartKind,
    out_dir: &Path,
) -> Result<()> {
    let domains = dashboard.role_domains(kind)?;
    let mut selection = default_selection(&domains);
    if let Some(x) = &args.x {
        selection.x = Some(x.clone());
    }
    if let Some(y) = &args.y {
        selection.y = Some(y.clone());
    }
    if let Some(color) = &args.color {
        selection.color = Some(color.clone());
    }

    match dashboard.chart(kind, &selection)? {
        ChartOutcome::Rendered(chart) => {
            let name = format!("chart_{}.svg", kind.as_str());
            let path = write_file(out_dir, &name, chart.svg.as_bytes())?;
            println!("{}: {}", chart.spec.title(), path.display());
        }
        ChartOutcome::NoNumericColumns => println!("{}", RenderError::NoNumericColumns),
        ChartOutcome::Failed { message } => eprintln!("{}", message),
    }
    Ok(())
}

fn write_exports(dashboard: &Dashboard, args: &Args, out_dir: &Path) -> Result<()> {
    let filter = args
        .filter_column
        .as_ref()
        .map(|column| RowFilter::new(column.clone(), args.filter_values.clone()));
    if let Some(filter) = filter.as_ref().filter(|f| !f.is_empty()) {
        println!("Filtered Rows: {}", dashboard.filtered_row_count(filter)?);
    }

    let at = chrono::Local::now().naive_local();
    let bundle: ExportBundle = dashboard.exports(filter.as_ref(), &at)?;
    for artifact in bundle.artifacts() {
        let path = artifact.write_to(out_dir)?;
        println!("{} ({} rows): {}", artifact.kind.label(), artifact.rows, path.display());
    }
    Ok(())
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    tracing::info!(file = %path.display(), "chart written");
    Ok(path)
}

fn run(args: &Args) -> Result<()> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let Some(source) = &args.source else {
        println!("{}", datadash::EMPTY_STATE_MESSAGE);
        println!();
        println!("CSV Example\n{}\n", datadash::CSV_EXAMPLE);
        println!("API Response Example\n{}", datadash::API_EXAMPLE);
        return Ok(());
    };

    let mut config = AppConfig::load(APP_NAME)?;
    apply_overrides(&mut config, args);
    config.validate()?;

    let out_dir = config
        .export
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let warehouse = SqlWarehouse::new(config.warehouse.clone(), config.file_loading.clone());
    let mut dashboard = Dashboard::new(
        config,
        datadash::loader::api::default_transport(),
        Box::new(warehouse),
    );

    let mut failed = false;
    for event in source_events(source)? {
        for notice in dashboard.handle(event) {
            failed |= notice.is_error();
            println!("{}", notice);
        }
    }
    if failed {
        return Err(eyre!("no data loaded"));
    }

    print_overview(&dashboard)?;
    if let Some(kind) = args.chart {
        render_chart(&mut dashboard, args, chart_kind(kind), &out_dir)?;
    }
    if args.stats {
        print_statistics(&dashboard, &out_dir)?;
    }
    if args.export {
        write_exports(&dashboard, args, &out_dir)?;
    }
    if let Some(footer) = dashboard.footer() {
        println!();
        println!("{}", footer);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    datadash::logging::init(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let args = Args::parse_from([
            "datadash",
            "--delimiter",
            "59",
            "--timeout-secs",
            "5",
            "--preview-rows",
            "3",
            "upload",
            "data.csv",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.file_loading.delimiter, Some(b';'));
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.export.preview_rows, 3);
        assert!(!config.file_loading.parse_dates);
    }

    #[test]
    fn query_source_edits_then_executes() {
        let events = source_events(&SourceCommand::Query {
            sql: "SELECT 1".to_string(),
        })
        .unwrap();
        assert_eq!(
            events,
            vec![
                DashboardEvent::QueryEdited("SELECT 1".to_string()),
                DashboardEvent::ExecuteQuery
            ]
        );
    }
}
