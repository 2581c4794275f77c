//! Warehouse loader: run a SQL query and return its result set.

use crate::config::{FileLoadingConfig, WarehouseConfig};
use crate::error::LoadError;
use crate::table::Table;

/// Something that can execute a query. Implementations own their connection settings.
pub trait Warehouse {
    fn execute(&self, query: &str) -> Result<Table, LoadError>;
}

/// Warehouse backed by the Polars SQL engine over the CSV tables listed in
/// `[warehouse.tables]`. Each query registers the tables fresh, so a source
/// that disappears surfaces as a connection error.
pub struct SqlWarehouse {
    config: WarehouseConfig,
    file_loading: FileLoadingConfig,
}

impl SqlWarehouse {
    pub fn new(config: WarehouseConfig, file_loading: FileLoadingConfig) -> Self {
        Self {
            config,
            file_loading,
        }
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.config.tables.keys().map(String::as_str).collect()
    }

    #[cfg(feature = "sql")]
    fn run(&self, query: &str) -> Result<Table, LoadError> {
        use crate::error_display::user_message_from_polars;
        use crate::loader::csv::load_csv_path;
        use polars::prelude::IntoLazy;
        use polars_sql::SQLContext;

        let mut ctx = SQLContext::new();
        for (name, path) in &self.config.tables {
            let table = load_csv_path(path, &self.file_loading)
                .map_err(|e| LoadError::Connection(format!("table '{}': {}", name, e)))?;
            ctx.register(name, table.into_frame().lazy());
        }

        let df = ctx
            .execute(query)
            .and_then(|lf| lf.collect())
            .map_err(|e| LoadError::Query(user_message_from_polars(&e)))?;
        Ok(Table::new(df))
    }

    #[cfg(not(feature = "sql"))]
    fn run(&self, _query: &str) -> Result<Table, LoadError> {
        Err(LoadError::Connection(
            "SQL support is not enabled in this build".to_string(),
        ))
    }
}

impl Warehouse for SqlWarehouse {
    fn execute(&self, query: &str) -> Result<Table, LoadError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LoadError::Query("query is empty".to_string()));
        }
        if self.config.tables.is_empty() {
            return Err(LoadError::Connection(
                "no warehouse tables are configured; add them under [warehouse.tables] in config.toml"
                    .to_string(),
            ));
        }
        tracing::debug!(tables = self.config.tables.len(), "executing warehouse query");
        self.run(query)
    }
}

#[cfg(all(test, feature = "sql"))]
mod tests {
    use super::*;
    use std::io::Write;

    fn warehouse_with(dir: &std::path::Path) -> SqlWarehouse {
        let path = dir.join("sales.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "category,value").unwrap();
        writeln!(file, "A,100").unwrap();
        writeln!(file, "B,150").unwrap();
        writeln!(file, "A,50").unwrap();

        let mut config = WarehouseConfig::default();
        config.tables.insert("MY_TABLE".to_string(), path);
        SqlWarehouse::new(config, FileLoadingConfig::default())
    }

    #[test]
    fn runs_query_over_registered_tables() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = warehouse_with(dir.path());
        let table = warehouse
            .execute("SELECT * FROM MY_TABLE WHERE value > 60")
            .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["category", "value"]);
    }

    #[test]
    fn bad_sql_is_a_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = warehouse_with(dir.path());
        assert!(matches!(
            warehouse.execute("SELECT * FROM NOT_THERE"),
            Err(LoadError::Query(_))
        ));
        assert!(matches!(warehouse.execute("   "), Err(LoadError::Query(_))));
    }

    #[test]
    fn missing_source_is_a_connection_error() {
        let mut config = WarehouseConfig::default();
        assert!(matches!(
            SqlWarehouse::new(config.clone(), FileLoadingConfig::default()).execute("SELECT 1"),
            Err(LoadError::Connection(_))
        ));

        config
            .tables
            .insert("T".to_string(), "/nonexistent/t.csv".into());
        assert!(matches!(
            SqlWarehouse::new(config, FileLoadingConfig::default()).execute("SELECT * FROM T"),
            Err(LoadError::Connection(_))
        ));
    }
}
