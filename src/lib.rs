//! Analytics dashboard core.
//!
//! A [`Dashboard`] owns the session, the loader cache, the loaders and the
//! configuration. Interactions arrive as [`DashboardEvent`]s and are handled
//! one at a time; every view is recomputed from the current table and
//! validated first.

use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod cache;
pub mod chart_config;
pub mod chart_data;
pub mod chart_render;
pub mod classify;
pub mod config;
pub mod error;
pub mod error_display;
pub mod export;
pub mod loader;
pub mod logging;
pub mod notice;
pub mod session;
pub mod source;
pub mod statistics;
pub mod table;
pub mod validate;

pub use cache::{CacheKey, CacheStatus, Clock, LoaderCache, ManualClock, SystemClock};
pub use chart_config::{default_selection, ChartKind, ChartSpec, Role, RoleDomains, RoleSelection};
pub use chart_render::{render_heatmap_svg, render_svg, ChartOutcome, ChartPanel, RenderedChart};
pub use classify::ColumnClasses;
pub use config::{AppConfig, ConfigManager};
pub use error::{ExportError, LoadError, RenderError, ValidationError, ViewError};
pub use export::{ExportArtifact, ExportBundle, RowFilter};
pub use loader::{HttpTransport, SqlWarehouse, Warehouse};
pub use notice::{Notice, NoticeLevel};
pub use session::{LoadedTable, Session};
pub use source::{Provenance, SourceKind};
pub use statistics::StatisticsReport;
pub use table::{ColumnKind, Table};
pub use validate::validate;

use cache::CachedLoad;
use error_display::{user_message_from_load, user_message_from_validation};
use loader::{fetch_table, load_csv_bytes};

pub const APP_NAME: &str = "datadash";

/// Shown with the examples when nothing is loaded.
pub const EMPTY_STATE_MESSAGE: &str = "Please select a data source to get started";

pub const CSV_EXAMPLE: &str = "date,category,value,count
2024-01-01,A,100,5
2024-01-02,B,150,8
2024-01-03,A,120,6";

pub const API_EXAMPLE: &str = r#"{
  "data": [
    {"date": "2024-01-01", "category": "A", "value": 100},
    {"date": "2024-01-02", "category": "B", "value": 150}
  ]
}"#;

/// One user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    SelectSource(SourceKind),
    /// A file was uploaded; loads immediately.
    Upload { filename: String, bytes: Vec<u8> },
    /// The query text changed. Never executes.
    QueryEdited(String),
    ExecuteQuery,
    EndpointEdited(String),
    FetchApi,
}

/// Sidebar and overview metrics of the current table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub numeric: usize,
    pub categorical: usize,
    pub filename: Option<String>,
}

pub struct Dashboard<C: Clock = SystemClock> {
    config: AppConfig,
    session: Session,
    cache: LoaderCache<C>,
    transport: Box<dyn HttpTransport>,
    warehouse: Box<dyn Warehouse>,
    charts: ChartPanel,
    source: SourceKind,
    query: String,
    endpoint: String,
}

impl Dashboard<SystemClock> {
    pub fn new(
        config: AppConfig,
        transport: Box<dyn HttpTransport>,
        warehouse: Box<dyn Warehouse>,
    ) -> Self {
        Self::with_clock(config, transport, warehouse, SystemClock)
    }
}

impl<C: Clock> Dashboard<C> {
    pub fn with_clock(
        config: AppConfig,
        transport: Box<dyn HttpTransport>,
        warehouse: Box<dyn Warehouse>,
        clock: C,
    ) -> Self {
        let cache = LoaderCache::with_clock(clock)
            .with_memoize_failures(config.cache.memoize_failures);
        Self {
            session: Session::new(),
            cache,
            transport,
            warehouse,
            charts: ChartPanel::new(&config.chart),
            source: SourceKind::default(),
            query: config.warehouse.default_query.clone(),
            endpoint: config.api.default_endpoint.clone(),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &LoaderCache<C> {
        &self.cache
    }

    pub fn selected_source(&self) -> SourceKind {
        self.source
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Apply one interaction. Loads go through the cache; a failed load leaves
    /// the current table in place.
    pub fn handle(&mut self, event: DashboardEvent) -> Vec<Notice> {
        match event {
            DashboardEvent::SelectSource(kind) => {
                debug!(source = kind.as_str(), "source selected");
                self.source = kind;
                vec![Notice::info(source_hint(kind))]
            }
            DashboardEvent::QueryEdited(query) => {
                self.query = query;
                Vec::new()
            }
            DashboardEvent::EndpointEdited(url) => {
                self.endpoint = url;
                Vec::new()
            }
            DashboardEvent::Upload { filename, bytes } => {
                self.source = SourceKind::Upload;
                let options = &self.config.file_loading;
                let (result, status) = self.cache.get_or_load(CacheKey::upload(&bytes), None, || {
                    load_csv_bytes(&bytes, options)
                });
                self.finish_load(result, status, Provenance::upload(filename))
            }
            DashboardEvent::ExecuteQuery => {
                self.source = SourceKind::Warehouse;
                let query = self.query.trim().to_string();
                let warehouse = self.warehouse.as_ref();
                let (result, status) = self
                    .cache
                    .get_or_load(CacheKey::query(&query), None, || warehouse.execute(&query));
                self.finish_load(result, status, Provenance::warehouse(query))
            }
            DashboardEvent::FetchApi => {
                self.source = SourceKind::Api;
                let url = self.endpoint.trim().to_string();
                let api = &self.config.api;
                let transport = self.transport.as_ref();
                let ttl = Duration::from_secs(api.cache_ttl_secs);
                let (result, status) = self.cache.get_or_load(CacheKey::api(&url), Some(ttl), || {
                    fetch_table(
                        transport,
                        &url,
                        Duration::from_secs(api.timeout_secs),
                        &api.data_keys,
                    )
                });
                self.finish_load(result, status, Provenance::api(url))
            }
        }
    }

    fn finish_load(
        &mut self,
        result: CachedLoad,
        status: CacheStatus,
        provenance: Provenance,
    ) -> Vec<Notice> {
        let source = provenance.kind.as_str();
        match result {
            Ok(table) => {
                info!(
                    source,
                    rows = table.row_count(),
                    columns = table.column_count(),
                    cache = ?status,
                    "table loaded"
                );
                let rows = table.row_count();
                self.session.replace(table, provenance);
                self.charts.clear();

                let mut notices = vec![Notice::success(format!("Loaded {} rows", rows))];
                if let Err(e) = validate(self.session.table()) {
                    notices.push(Notice::error(user_message_from_validation(&e)));
                }
                notices
            }
            Err(e) => {
                warn!(source, error = %e, cache = ?status, "load failed");
                vec![Notice::error(user_message_from_load(&e))]
            }
        }
    }

    /// The current table, if it passes validation.
    pub fn table(&self) -> Result<&Table, ValidationError> {
        validate(self.session.table())
    }

    pub fn dataset_info(&self) -> Result<DatasetInfo, ValidationError> {
        let table = self.table()?;
        let classes = ColumnClasses::of(table);
        Ok(DatasetInfo {
            rows: table.row_count(),
            columns: table.column_count(),
            numeric: classes.numeric.len(),
            categorical: classes.categorical.len(),
            filename: self
                .session
                .provenance()
                .and_then(Provenance::filename)
                .map(str::to_string),
        })
    }

    /// First `export.preview_rows` rows.
    pub fn preview(&self) -> Result<Table, ValidationError> {
        Ok(self.table()?.head(self.config.export.preview_rows))
    }

    /// Role domains for `kind` over the current table.
    pub fn role_domains(&self, kind: ChartKind) -> Result<RoleDomains, ValidationError> {
        let table = self.table()?;
        Ok(kind.role_domains(&ColumnClasses::of(table), &table.column_names()))
    }

    pub fn chart(
        &mut self,
        kind: ChartKind,
        selection: &RoleSelection,
    ) -> Result<ChartOutcome, ValidationError> {
        let table = validate(self.session.table())?;
        let classes = ColumnClasses::of(table);
        Ok(self.charts.render(table, &classes, kind, selection))
    }

    pub fn last_chart(&self) -> Option<&RenderedChart> {
        self.charts.last_rendered()
    }

    pub fn statistics(&self) -> Result<StatisticsReport, ViewError> {
        let table = self.table()?;
        Ok(StatisticsReport::compute(table, &ColumnClasses::of(table))?)
    }

    /// Correlation heat map of the current table as SVG, when it has two or more numeric columns.
    pub fn correlation_svg(&self, report: &StatisticsReport) -> Option<Result<String, RenderError>> {
        let size = (self.config.chart.width, self.config.chart.height);
        report
            .correlation
            .as_ref()
            .map(|heatmap| render_heatmap_svg(heatmap, size))
    }

    /// Values selectable for a filter on `column`.
    pub fn filter_values(&self, column: &str) -> Result<Vec<String>, ViewError> {
        Ok(export::unique_values(self.table()?, column)?)
    }

    pub fn filtered_row_count(&self, filter: &RowFilter) -> Result<usize, ViewError> {
        Ok(export::filter_rows(self.table()?, filter)?.row_count())
    }

    pub fn exports(
        &self,
        filter: Option<&RowFilter>,
        at: &NaiveDateTime,
    ) -> Result<ExportBundle, ViewError> {
        let table = self.table()?;
        Ok(ExportBundle::build_with_delimiter(
            table,
            filter,
            at,
            self.config.export.csv_delimiter,
        )?)
    }

    /// Footer line naming where the current table came from.
    pub fn footer(&self) -> Option<String> {
        self.session
            .source_kind()
            .map(|kind| format!("Data source: {}", kind))
    }
}

fn source_hint(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Upload => "Upload a CSV file for visualization",
        SourceKind::Warehouse => "Configure warehouse tables in the [warehouse] config section",
        SourceKind::Api => "Provide a REST API endpoint that returns JSON",
    }
}
