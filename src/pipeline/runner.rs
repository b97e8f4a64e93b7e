use metrics::counter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

use super::classifier::FileClassifier;
use super::resolver::FileResolver;
use super::stages::{FileScope, ProbabilityTable, Stage, StageContext, StageResult};
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::workbook::{read_workbook, write_tables, write_workbook};

/// A file passed through without transformation
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// A file dropped from the batch after an error
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

/// Structured summary of one stage over one file list
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub input_count: usize,
    /// Relative paths handed to the next stage, in input order
    pub output: Vec<String>,
    /// Inputs that were transformed and written
    pub processed: Vec<String>,
    /// Inputs passed through unchanged
    pub skipped: Vec<SkippedFile>,
    /// Inputs outside the stage's scope
    pub excluded: Vec<String>,
    /// Inputs dropped after an error
    pub errors: Vec<FileError>,
    /// Final demographic tables keyed by output path (last stage only)
    pub tables: BTreeMap<String, ProbabilityTable>,
}

impl StageReport {
    fn new(stage: &str, input_count: usize) -> Self {
        Self {
            stage: stage.to_string(),
            input_count,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

enum FileOutcome {
    Written(String),
    Tabulated(String, ProbabilityTable),
}

/// Drives one stage across a list of files with per-file error isolation
pub struct StageRunner<'a> {
    resolver: &'a FileResolver,
    classifier: &'a dyn FileClassifier,
    current_year: i32,
    sparse_column_min_values: usize,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        resolver: &'a FileResolver,
        classifier: &'a dyn FileClassifier,
        current_year: i32,
        sparse_column_min_values: usize,
    ) -> Self {
        Self {
            resolver,
            classifier,
            current_year,
            sparse_column_min_values,
        }
    }

    /// Run `stage` over `files`. Never fails as a whole: every per-file problem is
    /// recorded in the report and the file is left out of the output list.
    #[instrument(skip(self, stage, files), fields(stage = stage.name(), files = files.len()))]
    pub fn run(&self, stage: &dyn Stage, files: &[String]) -> StageReport {
        let mut report = StageReport::new(stage.name(), files.len());
        info!("🔄 Starting stage '{}' on {} selected files", stage.name(), files.len());

        for file in files {
            let advanced = self.classifier.is_advanced(file);

            if stage.scope() == FileScope::AdvancedOnly && !advanced {
                debug!(file = %file, "Not an advanced file, excluded from stage");
                report.excluded.push(file.clone());
                record(stage.name(), "excluded");
                continue;
            }

            match self.process_file(stage, file, advanced) {
                Ok(None) => {
                    report.skipped.push(SkippedFile {
                        path: file.clone(),
                        reason: "advanced file bypasses this stage".to_string(),
                    });
                    report.output.push(file.clone());
                    record(stage.name(), "skipped");
                }
                Ok(Some(FileOutcome::Written(output))) => {
                    report.processed.push(file.clone());
                    report.output.push(output);
                    record(stage.name(), "processed");
                }
                Ok(Some(FileOutcome::Tabulated(output, table))) => {
                    report.processed.push(file.clone());
                    report.output.push(output.clone());
                    report.tables.insert(output, table);
                    record(stage.name(), "processed");
                }
                Err(e) => {
                    error!(file = %file, "❌ Error processing file: {}", e);
                    report.errors.push(FileError {
                        path: file.clone(),
                        message: e.to_string(),
                    });
                    record(stage.name(), "error");
                }
            }
        }

        log_summary(&report);
        report
    }

    fn process_file(
        &self,
        stage: &dyn Stage,
        file: &str,
        advanced: bool,
    ) -> Result<Option<FileOutcome>> {
        let resolved = self.resolver.resolve(file)?;
        if !resolved.exists {
            return Err(PipelineError::NotFound(resolved.absolute_path));
        }

        if stage.skips_advanced() && advanced {
            info!(file = %file, "⏭️ Skipping advanced file");
            return Ok(None);
        }

        let workbook = read_workbook(&resolved.absolute_path)?;
        let ctx = StageContext {
            file,
            advanced,
            policy: stage.policy(),
            current_year: self.current_year,
            sparse_column_min_values: self.sparse_column_min_values,
        };

        let output_path = resolved.output_path();
        let outcome = match stage.transform(workbook, &ctx)? {
            StageResult::Workbook(workbook) => {
                write_workbook(&output_path, &workbook)?;
                FileOutcome::Written(self.resolver.relativize(&output_path))
            }
            StageResult::Sheets(tables) => {
                write_tables(&output_path, &tables)?;
                FileOutcome::Written(self.resolver.relativize(&output_path))
            }
            StageResult::Probabilities(table) => {
                let csv_path = probability_csv_path(&output_path);
                write_csv_atomically(&csv_path, &table)?;

                // The source workbook is replaced only when it lives in the transformed dir
                if resolved.absolute_path == output_path {
                    fs::remove_file(&resolved.absolute_path)?;
                } else {
                    debug!(file = %file, "Source outside transformed directory kept");
                }
                FileOutcome::Tabulated(self.resolver.relativize(&csv_path), table)
            }
        };

        Ok(Some(outcome))
    }
}

/// `<path without extension>_transformed.csv`
pub fn probability_csv_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}.csv", stem, constants::PROBABILITY_SUFFIX))
}

fn write_csv_atomically(path: &Path, table: &ProbabilityTable) -> Result<()> {
    let partial = path.with_extension("csv.partial");
    if let Err(e) = table.write_csv(&partial) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, path)?;
    Ok(())
}

fn record(stage: &'static str, outcome: &'static str) {
    counter!("survey_stage_files_total", "stage" => stage, "outcome" => outcome).increment(1);
}

fn log_summary(report: &StageReport) {
    info!(
        stage = %report.stage,
        selected = report.input_count,
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        excluded = report.excluded.len(),
        errors = report.errors.len(),
        "✅ Stage '{}' finished: {} processed, {} skipped, {} errors",
        report.stage,
        report.processed.len(),
        report.skipped.len(),
        report.errors.len()
    );
    for path in &report.output {
        info!(stage = %report.stage, "   → {}", path);
    }
    for skipped in &report.skipped {
        info!(stage = %report.stage, "   ⏭️ {} ({})", skipped.path, skipped.reason);
    }
    for failure in &report.errors {
        warn!(stage = %report.stage, "   ❌ {}: {}", failure.path, failure.message);
    }
}
