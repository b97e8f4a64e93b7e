use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use survey_pipeline::pipeline::stages::{
    MapAgeStage, ProbabilityStage, RemoveMetadataStage, RemoveSheetsStage, StripHeaderStage,
};
use survey_pipeline::pipeline::{FileResolver, MarkerClassifier, StageRunner};
use survey_pipeline::workbook::{read_workbook, write_workbook, Cell, Sheet, Workbook};

fn write_report(base: &Path, relative: &str, workbook: &Workbook) -> Result<()> {
    let path = base.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_workbook(&path, workbook)?;
    Ok(())
}

fn simple_report() -> Workbook {
    Workbook::new(vec![
        Sheet::new("Overview", vec![vec![Cell::text("cover")]]),
        Sheet::new(
            "Data",
            vec![
                vec![Cell::text("Topic"), Cell::text("Total")],
                vec![Cell::text("Survey Name: Bikes"), Cell::Empty],
                vec![Cell::text("Gen Z (1995-2012)"), Cell::Number(12.0)],
            ],
        ),
    ])
}

#[test]
fn test_sheet_pruning_is_idempotent_on_disk() -> Result<()> {
    let dir = tempdir()?;
    write_report(dir.path(), "topicA/report.xlsx", &simple_report())?;
    let resolver = FileResolver::new(dir.path(), "transformed");
    let classifier = MarkerClassifier::default();
    let runner = StageRunner::new(&resolver, &classifier, 2025, 4);

    let first = runner.run(&RemoveSheetsStage, &["topicA/report.xlsx".to_string()]);
    assert_eq!(first.output, vec!["topicA/transformed/report.xlsx".to_string()]);
    let once = read_workbook(&dir.path().join("topicA/transformed/report.xlsx"))?;
    assert_eq!(once.sheet_names(), vec!["Data"]);

    let second = runner.run(&RemoveSheetsStage, &first.output);
    assert_eq!(second.output, first.output);
    let twice = read_workbook(&dir.path().join("topicA/transformed/report.xlsx"))?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_advanced_files_skip_header_strip_unchanged() -> Result<()> {
    let dir = tempdir()?;
    write_report(dir.path(), "topicA/Report_ADV.xlsx", &simple_report())?;
    write_report(dir.path(), "topicA/report.xlsx", &simple_report())?;
    let resolver = FileResolver::new(dir.path(), "transformed");
    let classifier = MarkerClassifier::default();
    let runner = StageRunner::new(&resolver, &classifier, 2025, 4);

    let files = vec!["topicA/Report_ADV.xlsx".to_string(), "topicA/report.xlsx".to_string()];
    let report = runner.run(&StripHeaderStage, &files);

    assert_eq!(
        report.output,
        vec![
            "topicA/Report_ADV.xlsx".to_string(),
            "topicA/transformed/report.xlsx".to_string()
        ]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, "topicA/Report_ADV.xlsx");
    assert!(!dir.path().join("topicA/transformed/Report_ADV.xlsx").exists());
    Ok(())
}

#[test]
fn test_malformed_workbook_is_isolated() -> Result<()> {
    let dir = tempdir()?;
    write_report(dir.path(), "topicA/good.xlsx", &simple_report())?;
    fs::write(dir.path().join("topicA/bad.xlsx"), b"definitely not a zip archive")?;
    let resolver = FileResolver::new(dir.path(), "transformed");
    let classifier = MarkerClassifier::default();
    let runner = StageRunner::new(&resolver, &classifier, 2025, 4);

    let files = vec!["topicA/bad.xlsx".to_string(), "topicA/good.xlsx".to_string()];
    let report = runner.run(&RemoveMetadataStage, &files);

    assert_eq!(report.output, vec!["topicA/transformed/good.xlsx".to_string()]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "topicA/bad.xlsx");

    let cleaned = read_workbook(&dir.path().join("topicA/transformed/good.xlsx"))?;
    let data = cleaned.sheet("Data").unwrap();
    assert!(data
        .grid
        .iter()
        .flatten()
        .all(|cell| !cell.as_text().contains("Survey Name:")));
    Ok(())
}

#[test]
fn test_generation_labels_mapped_with_configured_year() -> Result<()> {
    let dir = tempdir()?;
    write_report(dir.path(), "topicA/report.xlsx", &simple_report())?;
    let resolver = FileResolver::new(dir.path(), "transformed");
    let classifier = MarkerClassifier::default();
    let runner = StageRunner::new(&resolver, &classifier, 2030, 4);

    let report = runner.run(&MapAgeStage, &["topicA/report.xlsx".to_string()]);
    assert_eq!(report.processed.len(), 1);

    let mapped = read_workbook(&dir.path().join("topicA/transformed/report.xlsx"))?;
    let data = mapped.sheet("Data").unwrap();
    assert_eq!(data.grid[2][0], Cell::text("18-35 years"));
    Ok(())
}

#[test]
fn test_probability_stage_excludes_standard_files() -> Result<()> {
    let dir = tempdir()?;
    write_report(dir.path(), "topicA/report.xlsx", &simple_report())?;
    let resolver = FileResolver::new(dir.path(), "transformed");
    let classifier = MarkerClassifier::default();
    let runner = StageRunner::new(&resolver, &classifier, 2025, 4);

    let report = runner.run(&ProbabilityStage, &["topicA/report.xlsx".to_string()]);
    assert!(report.is_empty());
    assert_eq!(report.excluded, vec!["topicA/report.xlsx".to_string()]);
    assert!(report.errors.is_empty());
    Ok(())
}

#[test]
fn test_probability_failure_keeps_source_workbook() -> Result<()> {
    let dir = tempdir()?;
    let broken = Workbook::new(vec![Sheet::new(
        "Data",
        vec![
            vec![Cell::text("Index"), Cell::text("Column_1")],
            vec![Cell::text("Topic"), Cell::text("Q_Yes")],
            vec![Cell::text("Female"), Cell::Number(1.0)],
            vec![Cell::text("18-29 years"), Cell::Number(1.0)],
        ],
    )]);
    write_report(dir.path(), "topicA/transformed/report_adv.xlsx", &broken)?;
    let resolver = FileResolver::new(dir.path(), "transformed");
    let classifier = MarkerClassifier::default();
    let runner = StageRunner::new(&resolver, &classifier, 2025, 4);

    let report = runner.run(&ProbabilityStage, &["topicA/transformed/report_adv.xlsx".to_string()]);

    assert!(report.output.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(dir.path().join("topicA/transformed/report_adv.xlsx").exists());
    assert!(!dir.path().join("topicA/transformed/report_adv_transformed.csv").exists());
    assert!(!dir
        .path()
        .join("topicA/transformed/report_adv_transformed.csv.partial")
        .exists());
    Ok(())
}
