mod common;

use color_eyre::Result;
use datadash::config::FileLoadingConfig;
use datadash::loader::{load_csv_bytes, load_csv_path};
use datadash::statistics::{
    CorrelationHeatmap, CorrelationMatrix, DescribeTable, MissingReport, StatisticsReport,
};
use datadash::ColumnClasses;

const TWO_ROWS: &str = "date,category,value\n2024-01-01,A,100\n2024-01-02,B,150\n";

#[test]
fn describe_of_two_row_example() -> Result<()> {
    let table = load_csv_bytes(TWO_ROWS.as_bytes(), &FileLoadingConfig::default())?;
    assert_eq!(table.row_count(), 2);

    let classes = ColumnClasses::of(&table);
    assert_eq!(classes.numeric, vec!["value".to_string()]);
    assert_eq!(
        classes.categorical,
        vec!["date".to_string(), "category".to_string()]
    );

    let describe = DescribeTable::compute(&table, &classes.numeric)?;
    let value = describe.column("value").unwrap();
    assert_eq!(value.count, 2);
    assert_eq!(value.min, Some(100.0));
    assert_eq!(value.max, Some(150.0));
    assert_eq!(value.mean, Some(125.0));
    assert_eq!(value.median, Some(125.0));
    let std = value.std.unwrap();
    assert!((std - 35.355339).abs() < 1e-6, "{std}");
    Ok(())
}

#[test]
fn describe_frame_has_statistic_labels() -> Result<()> {
    let table = load_csv_path(common::sample_path(), &FileLoadingConfig::default())?;
    let classes = ColumnClasses::of(&table);
    let frame = DescribeTable::compute(&table, &classes.numeric)?.to_frame()?;

    assert_eq!(frame.height(), 8);
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, vec!["statistic", "value", "count"]);
    Ok(())
}

#[test]
fn correlation_is_symmetric_and_bounded() -> Result<()> {
    let table = load_csv_path(common::sample_path(), &FileLoadingConfig::default())?;
    let classes = ColumnClasses::of(&table);
    let matrix = CorrelationMatrix::compute(&table, &classes.numeric)?;

    let r = matrix.get("value", "count").unwrap();
    assert_eq!(matrix.get("count", "value"), Some(r));
    assert!((-1.0..=1.0).contains(&r));
    assert!(r > 0.9, "{r}");
    assert!((matrix.get("value", "value").unwrap() - 1.0).abs() < 1e-12);

    let heatmap = CorrelationHeatmap::from_matrix(&matrix);
    assert_eq!(heatmap.cells.len(), 4);
    assert_eq!(heatmap.cells[0].text, "1.00");
    assert_eq!((heatmap.z_min, heatmap.z_max), (-1.0, 1.0));
    Ok(())
}

#[test]
fn missing_report_matches_table_missing_count() -> Result<()> {
    let table = load_csv_path(common::sample_path(), &FileLoadingConfig::default())?;
    let report = MissingReport::compute(&table)?;

    match &report {
        MissingReport::Columns(columns) => {
            let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["value", "count"]);
            assert_eq!(columns[0].count, 1);
            assert_eq!(columns[0].percentage, 16.67);
        }
        MissingReport::NoneMissing => panic!("sample has missing values"),
    }
    assert_eq!(report.total(), table.missing_count()?);
    Ok(())
}

#[test]
fn text_only_table_still_gets_missing_report() -> Result<()> {
    let table = load_csv_bytes(b"name,city\nann,\nbob,paris\n", &FileLoadingConfig::default())?;
    let classes = ColumnClasses::of(&table);
    let report = StatisticsReport::compute(&table, &classes)?;

    assert!(report.describe.is_none());
    assert!(report.correlation.is_none());
    assert_eq!(report.missing.total(), 1);
    let messages: Vec<String> = report.notices().into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec!["No numeric columns available for statistical analysis".to_string()]
    );
    Ok(())
}
