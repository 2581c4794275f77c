//! Shared CLI definitions for datadash.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Chart kinds offered by the chart panel
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ChartKindArg {
    /// Bar chart: x any column, y numeric
    Bar,
    /// Line chart with markers: x any column, y numeric
    Line,
    /// Scatter plot: x and y numeric
    Scatter,
    /// Box plot: numeric values, optionally grouped by a categorical column
    Box,
    /// Histogram of one numeric column
    Histogram,
}

/// Where the table comes from
#[derive(Clone, Subcommand, Debug, PartialEq, Eq)]
pub enum SourceCommand {
    /// Load a local CSV file
    Upload {
        /// Path to the CSV file
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Run a SQL query against the configured warehouse tables
    Query {
        /// SQL text, e.g. "SELECT * FROM sales LIMIT 1000"
        #[arg(value_name = "SQL")]
        sql: String,
    },
    /// Fetch JSON rows from a REST endpoint (GET)
    Fetch {
        /// Full URL of the endpoint
        #[arg(value_name = "URL")]
        url: String,
    },
}

/// Command-line arguments for datadash
#[derive(Clone, Parser, Debug)]
#[command(
    name = "datadash",
    version,
    about = "Load a table from CSV, SQL or a JSON API, then chart, summarize and export it"
)]
pub struct Args {
    /// Data source to load (not required with --generate-config)
    #[command(subcommand)]
    pub source: Option<SourceCommand>,

    /// Render a chart of this kind into the output directory (SVG)
    #[arg(long = "chart", value_enum, global = true)]
    pub chart: Option<ChartKindArg>,

    /// Column for the chart x role (box plot: grouping column)
    #[arg(long = "x", value_name = "COL", global = true)]
    pub x: Option<String>,

    /// Column for the chart y role
    #[arg(long = "y", value_name = "COL", global = true)]
    pub y: Option<String>,

    /// Categorical column used to color the chart
    #[arg(long = "color", value_name = "COL", global = true)]
    pub color: Option<String>,

    /// Print descriptive statistics, correlations and the missing-value report
    #[arg(long = "stats", action, global = true)]
    pub stats: bool,

    /// Write CSV and XLSX exports into the output directory
    #[arg(long = "export", action, global = true)]
    pub export: bool,

    /// Categorical column used to filter the exported rows
    #[arg(long = "filter-column", value_name = "COL", global = true)]
    pub filter_column: Option<String>,

    /// Keep rows whose filter column equals this value (repeatable)
    #[arg(long = "filter-value", value_name = "VAL", requires = "filter_column", global = true)]
    pub filter_values: Vec<String>,

    /// Directory for charts and exports (default: config [export] output_dir, else current directory)
    #[arg(long = "output-dir", value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Number of rows shown in the data preview (default: 10)
    #[arg(long = "preview-rows", value_name = "N", global = true)]
    pub preview_rows: Option<usize>,

    /// Specify the delimiter to use when reading a CSV file
    #[arg(long = "delimiter", global = true)]
    pub delimiter: Option<u8>,

    /// Try to parse CSV string columns as dates (default: false)
    #[arg(long = "parse-dates", value_name = "BOOL", value_parser = clap::value_parser!(bool), global = true)]
    pub parse_dates: Option<bool>,

    /// Timeout in seconds for API requests (default: 30)
    #[arg(long = "timeout-secs", value_name = "SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Enable debug logging (same as RUST_LOG=datadash=debug)
    #[arg(long = "debug", action, global = true)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/datadash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn option_string(arg: &clap::Arg) -> String {
    let placeholder: String = arg
        .get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    if arg.is_positional() {
        return if arg.is_required_set() {
            placeholder
        } else {
            format!("[{placeholder}]")
        };
    }

    let mut parts = Vec::new();
    if let Some(s) = arg.get_short() {
        parts.push(format!("-{s}"));
    }
    if let Some(l) = arg.get_long() {
        parts.push(format!("--{l}"));
    }
    let op = parts.join(", ");
    if !arg.get_action().takes_values() || placeholder.is_empty() {
        op
    } else {
        format!("{op} {placeholder}")
    }
}

/// Render command-line options and source subcommands as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    out.push_str(&cmd.render_usage().to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");
    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }
        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("| `{}` | {help} |\n", option_string(arg)));
    }

    out.push_str("\n## Sources\n\n");
    out.push_str("| Command | Description |\n");
    out.push_str("|---------|-------------|\n");
    for sub in cmd.get_subcommands() {
        if sub.get_name() == "help" {
            continue;
        }
        let positional = sub
            .get_arguments()
            .filter(|a| a.is_positional())
            .map(option_string)
            .collect::<Vec<_>>()
            .join(" ");
        let about = sub
            .get_about()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("| `{} {positional}` | {about} |\n", sub.get_name()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_with_chart_options() {
        let args = Args::parse_from([
            "datadash", "upload", "sales.csv", "--chart", "bar", "--x", "category", "--y", "value",
        ]);
        assert_eq!(
            args.source,
            Some(SourceCommand::Upload {
                path: PathBuf::from("sales.csv")
            })
        );
        assert_eq!(args.chart, Some(ChartKindArg::Bar));
        assert_eq!(args.x.as_deref(), Some("category"));
        assert_eq!(args.y.as_deref(), Some("value"));
        assert!(args.color.is_none());
    }

    #[test]
    fn filter_values_are_repeatable() {
        let args = Args::parse_from([
            "datadash",
            "--filter-column",
            "category",
            "--filter-value",
            "A",
            "--filter-value",
            "B",
            "fetch",
            "https://example.com/data",
        ]);
        assert_eq!(args.filter_column.as_deref(), Some("category"));
        assert_eq!(args.filter_values, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn generate_config_needs_no_source() {
        let args = Args::parse_from(["datadash", "--generate-config"]);
        assert!(args.generate_config);
        assert!(args.source.is_none());
    }

    #[test]
    fn markdown_lists_options_and_sources() {
        let md = render_options_markdown();
        assert!(md.contains("--chart"));
        assert!(md.contains("| `upload <PATH>`"));
        assert!(md.contains("| `fetch <URL>`"));
    }
}
