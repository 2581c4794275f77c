use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments
    /// All fields are commented out so defaults are used, but users can uncomment to override
    pub fn generate_default_config(&self) -> String {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        Self::comment_all_fields(toml_str, Self::collect_all_comments())
    }

    /// Collect all field comments from struct constants into a map
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        let sections: [(&str, &[(&str, &str)]); 6] = [
            ("file_loading", FILE_LOADING_COMMENTS),
            ("api", API_COMMENTS),
            ("cache", CACHE_COMMENTS),
            ("warehouse", WAREHOUSE_COMMENTS),
            ("chart", CHART_COMMENTS),
            ("export", EXPORT_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }

        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Also adds missing Option fields as commented-out `# field = null`
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# datadash configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        let mut in_array = false;

        for line in toml.lines() {
            // Continuation lines of a multi-line array
            if in_array {
                in_array = line.trim() != "]";
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();
                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header.1);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                in_array = line.trim_end().ends_with('[');
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add missing Option fields that weren't serialized (because they're None)
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = [
            "file_loading.delimiter",
            "warehouse.host",
            "warehouse.account",
            "warehouse.user",
            "warehouse.password",
            "warehouse.database",
            "warehouse.schema",
            "export.output_dir",
        ];

        let mut missing_by_section: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for field_path in option_fields {
            if !seen_fields.contains(field_path) && comments.contains_key(field_path) {
                if let Some((section, _)) = field_path.split_once('.') {
                    missing_by_section.entry(section).or_default().push(field_path);
                }
            }
        }

        for (section, fields) in &missing_by_section {
            let section_header = format!("[{}]", section);
            if let Some(section_pos) = result.find(&section_header) {
                let after_header_start = section_pos + section_header.len();
                let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
                let insert_pos = after_header_start + newline_pos + 1;

                let mut new_content = String::new();
                for field_path in fields {
                    if let Some(comment) = comments.get(*field_path) {
                        for comment_line in comment.lines() {
                            new_content.push_str("# ");
                            new_content.push_str(comment_line);
                            new_content.push('\n');
                        }
                    }
                    let field_name = field_path.rsplit('.').next().unwrap_or(field_path);
                    new_content.push_str(&format!("# {} = null\n", field_name));
                    new_content.push('\n');
                }

                result.insert_str(insert_pos, &new_content);
            }
        }

        result
    }

    /// Extract section name from TOML line like "[api]" or "[warehouse.tables]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub warehouse: WarehouseConfig,
    pub chart: ChartConfig,
    pub export: ExportConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "file_loading",
        "# ============================================================================\n# CSV Upload\n# ============================================================================",
    ),
    (
        "api",
        "# ============================================================================\n# REST API Source\n# ============================================================================",
    ),
    (
        "cache",
        "# ============================================================================\n# Loader Cache\n# ============================================================================",
    ),
    (
        "warehouse",
        "# ============================================================================\n# Warehouse Source\n# ============================================================================\n# Connection settings are passed through untouched and never logged.",
    ),
    (
        "warehouse.tables",
        "# Tables available to SQL queries: name = \"path/to/file.csv\"",
    ),
    (
        "chart",
        "# ============================================================================\n# Charts\n# ============================================================================",
    ),
    (
        "export",
        "# ============================================================================\n# Export\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoadingConfig {
    /// Delimiter for CSV files (as ASCII value, e.g. 59 for ';'). None = comma.
    pub delimiter: Option<u8>,
    /// When true, CSV reader tries to parse string columns as dates.
    pub parse_dates: bool,
    /// Rows used to infer column types.
    pub infer_schema_length: usize,
    /// When true, unparseable values become null instead of failing the load.
    pub ignore_errors: bool,
    /// Cell texts read as missing values. Empty cells are always missing.
    pub null_values: Vec<String>,
}

/// Missing-value markers recognised in CSV uploads by default.
pub const DEFAULT_NULL_VALUES: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl Default for FileLoadingConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            parse_dates: false,
            infer_schema_length: 1000,
            ignore_errors: false,
            null_values: DEFAULT_NULL_VALUES.iter().map(|v| v.to_string()).collect(),
        }
    }
}

const FILE_LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "delimiter",
        "Delimiter for CSV files (as ASCII value, e.g., 59 for ';')\nIf not specified, comma is used",
    ),
    (
        "parse_dates",
        "When true, CSV reader tries to parse string columns as dates (e.g. YYYY-MM-DD).\nParsed date columns are neither numeric nor categorical.",
    ),
    (
        "infer_schema_length",
        "Number of rows used to infer column types",
    ),
    (
        "ignore_errors",
        "When true, values that do not fit the inferred type become null instead of failing the load",
    ),
    (
        "null_values",
        "Cell texts treated as missing values (empty cells are always missing).\nSet to [] to keep markers such as NA as text",
    ),
];

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = Self::default();
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.parse_dates != default.parse_dates {
            self.parse_dates = other.parse_dates;
        }
        if other.infer_schema_length != default.infer_schema_length {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.ignore_errors != default.ignore_errors {
            self.ignore_errors = other.ignore_errors;
        }
        if other.null_values != default.null_values {
            self.null_values = other.null_values;
        }
    }
}

/// Keys searched, in order, for the row list of an object response.
pub const DEFAULT_DATA_KEYS: [&str; 4] = ["data", "results", "items", "records"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub data_keys: Vec<String>,
    pub default_endpoint: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            cache_ttl_secs: 3600,
            data_keys: DEFAULT_DATA_KEYS.iter().map(|k| k.to_string()).collect(),
            default_endpoint: "https://api.example.com/data".to_string(),
        }
    }
}

const API_COMMENTS: &[(&str, &str)] = &[
    ("timeout_secs", "Seconds to wait for an API response"),
    (
        "cache_ttl_secs",
        "Seconds an API response stays cached before it is fetched again",
    ),
    (
        "data_keys",
        "Keys searched, in order, for the row list when the response is a JSON object",
    ),
    ("default_endpoint", "Endpoint pre-filled in the API source"),
];

impl ApiConfig {
    pub fn merge(&mut self, other: Self) {
        let default = Self::default();
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.cache_ttl_secs != default.cache_ttl_secs {
            self.cache_ttl_secs = other.cache_ttl_secs;
        }
        if other.data_keys != default.data_keys {
            self.data_keys = other.data_keys;
        }
        if other.default_endpoint != default.default_endpoint {
            self.default_endpoint = other.default_endpoint;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When true, failed loads are cached too (a re-trigger shows the same error until expiry).
    pub memoize_failures: bool,
}

const CACHE_COMMENTS: &[(&str, &str)] = &[(
    "memoize_failures",
    "When true, failed loads are cached like successful ones.\nWhen false (default), re-running a failed load tries again.",
)];

impl CacheConfig {
    pub fn merge(&mut self, other: Self) {
        if other.memoize_failures {
            self.memoize_failures = true;
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub host: Option<String>,
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub default_query: String,
    /// Table name → CSV file registered for SQL queries.
    pub tables: BTreeMap<String, PathBuf>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: None,
            account: None,
            user: None,
            password: None,
            database: None,
            schema: None,
            default_query: "SELECT * FROM MY_TABLE LIMIT 1000".to_string(),
            tables: BTreeMap::new(),
        }
    }
}

// Credentials stay out of logs and panics.
impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("default_query", &self.default_query)
            .field("tables", &self.tables)
            .finish()
    }
}

const WAREHOUSE_COMMENTS: &[(&str, &str)] = &[
    ("host", "Warehouse host"),
    ("account", "Warehouse account identifier"),
    ("user", "User name"),
    ("password", "Password (prefer file permissions 0600 for this file)"),
    ("database", "Default database"),
    ("schema", "Default schema"),
    ("default_query", "Query pre-filled in the warehouse source"),
];

impl WarehouseConfig {
    pub fn merge(&mut self, other: Self) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.account.is_some() {
            self.account = other.account;
        }
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.default_query != Self::default().default_query {
            self.default_query = other.default_query;
        }
        self.tables.extend(other.tables);
    }
}

pub const MIN_HISTOGRAM_BINS: usize = 1;
pub const MAX_HISTOGRAM_BINS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub histogram_bins: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            histogram_bins: 20,
        }
    }
}

const CHART_COMMENTS: &[(&str, &str)] = &[
    ("width", "Rendered chart width in pixels"),
    ("height", "Rendered chart height in pixels"),
    ("histogram_bins", "Number of histogram bins"),
];

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = Self::default();
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
        if other.histogram_bins != default.histogram_bins {
            self.histogram_bins = other.histogram_bins;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: Option<PathBuf>,
    /// CSV export delimiter (as ASCII value)
    pub csv_delimiter: u8,
    pub preview_rows: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            csv_delimiter: b',',
            preview_rows: 10,
        }
    }
}

const EXPORT_COMMENTS: &[(&str, &str)] = &[
    (
        "output_dir",
        "Directory for charts and exports. null = current directory",
    ),
    ("csv_delimiter", "CSV export delimiter (as ASCII value, 44 = ',')"),
    ("preview_rows", "Rows shown in the data preview"),
];

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = Self::default();
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.csv_delimiter != default.csv_delimiter {
            self.csv_delimiter = other.csv_delimiter;
        }
        if other.preview_rows != default.preview_rows {
            self.preview_rows = other.preview_rows;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            warehouse: WarehouseConfig::default(),
            chart: ChartConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load configuration using the config file of `manager`
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(&config_path)?);

        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_path.display(), e))?;

        Ok(config)
    }

    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.api.merge(other.api);
        self.cache.merge(other.cache);
        self.warehouse.merge(other.warehouse);
        self.chart.merge(other.chart);
        self.export.merge(other.export);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(eyre!("api.timeout_secs must be greater than 0"));
        }

        if self.api.data_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(eyre!("api.data_keys must not contain empty keys"));
        }

        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(eyre!("chart.width and chart.height must be greater than 0"));
        }

        if !(MIN_HISTOGRAM_BINS..=MAX_HISTOGRAM_BINS).contains(&self.chart.histogram_bins) {
            return Err(eyre!(
                "chart.histogram_bins must be between {} and {}, got {}",
                MIN_HISTOGRAM_BINS,
                MAX_HISTOGRAM_BINS,
                self.chart.histogram_bins
            ));
        }

        if !self.export.csv_delimiter.is_ascii() {
            return Err(eyre!("export.csv_delimiter must be an ASCII character"));
        }

        Ok(())
    }
}
