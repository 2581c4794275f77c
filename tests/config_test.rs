use color_eyre::Result;
use datadash::config::{AppConfig, ConfigManager, DEFAULT_DATA_KEYS, DEFAULT_NULL_VALUES};
use std::path::PathBuf;

fn manager() -> (tempfile::TempDir, ConfigManager) {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::with_dir(dir.path().join("datadash"));
    (dir, manager)
}

#[test]
fn defaults_match_documented_values() {
    let config = AppConfig::default();
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.api.cache_ttl_secs, 3600);
    assert_eq!(config.api.data_keys, DEFAULT_DATA_KEYS.map(String::from).to_vec());
    assert!(!config.file_loading.parse_dates);
    assert!(!config.cache.memoize_failures);
    assert_eq!(config.chart.histogram_bins, 20);
    assert!(config.validate().is_ok());
}

#[test]
fn generated_template_parses_to_defaults() -> Result<()> {
    let (_dir, manager) = manager();
    let template = manager.generate_default_config();

    assert!(template.contains("# [api]"));
    assert!(template.contains("# timeout_secs = 30"));
    assert!(template.contains("# password = null"));
    assert!(template.contains("# output_dir = null"));

    let parsed: AppConfig = toml::from_str(&template)?;
    assert_eq!(parsed.api.timeout_secs, 30);
    assert_eq!(parsed.file_loading.null_values.len(), DEFAULT_NULL_VALUES.len());
    assert_eq!(parsed.warehouse.default_query, "SELECT * FROM MY_TABLE LIMIT 1000");
    Ok(())
}

#[test]
fn write_default_config_refuses_to_overwrite_without_force() -> Result<()> {
    let (_dir, manager) = manager();
    let path = manager.write_default_config(false)?;
    assert!(path.exists());

    let err = manager.write_default_config(false).unwrap_err();
    assert!(err.to_string().contains("--force"));
    assert_eq!(manager.write_default_config(true)?, path);
    Ok(())
}

#[test]
fn user_file_overrides_defaults() -> Result<()> {
    let (_dir, manager) = manager();
    manager.ensure_config_dir()?;
    std::fs::write(
        manager.config_path("config.toml"),
        r#"
[api]
timeout_secs = 5
data_keys = ["rows"]

[warehouse]
user = "analyst"

[warehouse.tables]
sales = "data/sales.csv"

[file_loading]
null_values = []

[chart]
histogram_bins = 40
"#,
    )?;

    let config = AppConfig::load_from(&manager)?;
    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.api.cache_ttl_secs, 3600);
    assert_eq!(config.api.data_keys, vec!["rows".to_string()]);
    assert_eq!(config.warehouse.user.as_deref(), Some("analyst"));
    assert_eq!(
        config.warehouse.tables.get("sales"),
        Some(&PathBuf::from("data/sales.csv"))
    );
    assert_eq!(config.chart.histogram_bins, 40);
    assert_eq!(config.chart.width, 1000);
    assert!(config.file_loading.null_values.is_empty());
    Ok(())
}

#[test]
fn invalid_values_are_rejected_on_load() -> Result<()> {
    let (_dir, manager) = manager();
    manager.ensure_config_dir()?;
    std::fs::write(
        manager.config_path("config.toml"),
        "[chart]\nhistogram_bins = 1000\n",
    )?;

    let err = AppConfig::load_from(&manager).unwrap_err();
    assert!(err.to_string().contains("histogram_bins"), "{err}");
    Ok(())
}

#[test]
fn missing_file_means_defaults() -> Result<()> {
    let (_dir, manager) = manager();
    let config = AppConfig::load_from(&manager)?;
    assert_eq!(config.export.preview_rows, 10);
    Ok(())
}

#[test]
fn debug_output_hides_password() {
    let mut config = AppConfig::default();
    config.warehouse.password = Some("hunter2".to_string());
    let shown = format!("{:?}", config);
    assert!(!shown.contains("hunter2"));
    assert!(shown.contains("<redacted>"));
}
