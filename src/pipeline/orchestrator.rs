use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::classifier::{FileClassifier, MarkerClassifier};
use super::resolver::FileResolver;
use super::runner::{StageReport, StageRunner};
use super::stages::{default_stages, ProbabilityTable, Stage};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::progress::{ProgressSink, ProgressUpdate};

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub selected: Vec<String>,
    /// One report per stage that ran, in order
    pub reports: Vec<StageReport>,
    /// Stage whose output list came back empty, if the run stopped early
    pub halted_at: Option<String>,
    /// Final demographic tables keyed by their CSV path
    pub tables: BTreeMap<String, ProbabilityTable>,
}

impl PipelineOutcome {
    /// Relative paths produced by the last stage that ran
    pub fn final_files(&self) -> Vec<String> {
        self.reports
            .last()
            .map(|report| report.output.clone())
            .unwrap_or_default()
    }

    pub fn completed(&self) -> bool {
        self.halted_at.is_none()
    }
}

/// Linear twelve-stage driver: each stage receives exactly its predecessor's output
pub struct Pipeline {
    config: PipelineConfig,
    resolver: FileResolver,
    classifier: Box<dyn FileClassifier>,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let classifier = Box::new(MarkerClassifier::new(&config.advanced_marker));
        Self::with_classifier(config, classifier)
    }

    pub fn with_classifier(config: PipelineConfig, classifier: Box<dyn FileClassifier>) -> Self {
        let resolver = FileResolver::new(&config.base_dir, &config.transformed_dir_name);
        let stages = default_stages(&config);
        Self {
            config,
            resolver,
            classifier,
            stages,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    /// Stage names in pipeline order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn runner(&self) -> StageRunner<'_> {
        StageRunner::new(
            &self.resolver,
            self.classifier.as_ref(),
            self.config.year(),
            self.config.sparse_column_min_values,
        )
    }

    fn check_base_dir(&self) -> Result<()> {
        if self.resolver.base_dir().is_dir() {
            Ok(())
        } else {
            Err(PipelineError::BaseDir(self.resolver.base_dir().to_path_buf()))
        }
    }

    /// Run every stage in order over `selected`.
    ///
    /// Per-file problems end up in the stage reports; only an unusable base directory
    /// fails the call.
    #[instrument(skip(self, selected, progress), fields(files = selected.len()))]
    pub fn run(&self, selected: &[String], progress: &dyn ProgressSink) -> Result<PipelineOutcome> {
        self.check_base_dir()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = self.stages.len();
        counter!("survey_pipeline_runs_total").increment(1);
        info!(%run_id, "🚀 Starting transformation pipeline on {} files", selected.len());

        progress.report(ProgressUpdate {
            percent: 0,
            status: "🔄 Starting transformation pipeline".to_string(),
            stage_index: None,
        });

        let runner = self.runner();
        let mut files = selected.to_vec();
        let mut reports = Vec::with_capacity(total);
        let mut halted_at = None;

        for (index, stage) in self.stages.iter().enumerate() {
            let report = runner.run(stage.as_ref(), &files);
            let percent = percent_done(index + 1, total);
            files = report.output.clone();
            let empty = report.is_empty();
            reports.push(report);

            if empty {
                warn!(
                    %run_id,
                    stage = stage.name(),
                    "⚠️ No files left after '{}', stopping pipeline",
                    stage.description()
                );
                progress.report(ProgressUpdate {
                    percent,
                    status: format!("⚠️ No files left after: {}", stage.description()),
                    stage_index: Some(index),
                });
                halted_at = Some(stage.name().to_string());
                break;
            }

            progress.report(ProgressUpdate {
                percent,
                status: format!("✅ {} completed", stage.description()),
                stage_index: Some(index),
            });
        }

        let tables = if halted_at.is_none() {
            reports
                .last()
                .map(|report| report.tables.clone())
                .unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        progress.report(ProgressUpdate {
            percent: 100,
            status: "✅ Transformation pipeline completed".to_string(),
            stage_index: None,
        });
        info!(
            %run_id,
            stages_run = reports.len(),
            tables = tables.len(),
            "✅ Transformation pipeline completed"
        );

        Ok(PipelineOutcome {
            run_id,
            started_at,
            finished_at: Utc::now(),
            selected: selected.to_vec(),
            reports,
            halted_at,
            tables,
        })
    }

    /// Run a single stage by name over `files`
    pub fn run_stage(&self, name: &str, files: &[String]) -> Result<StageReport> {
        self.check_base_dir()?;
        let stage = self
            .stages
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "Unknown stage '{}'. Available: {}",
                    name,
                    self.stage_names().join(", ")
                ))
            })?;
        Ok(self.runner().run(stage.as_ref(), files))
    }
}

fn percent_done(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(completed.min(total) * 100 / total).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressTracker;
    use tempfile::tempdir;

    #[test]
    fn test_percent_done() {
        assert_eq!(percent_done(0, 12), 0);
        assert_eq!(percent_done(6, 12), 50);
        assert_eq!(percent_done(12, 12), 100);
        assert_eq!(percent_done(1, 0), 100);
    }

    #[test]
    fn test_missing_base_dir_is_systemic_error() {
        let config = PipelineConfig {
            base_dir: "definitely/not/here".into(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config);
        let result = pipeline.run(&["a.xlsx".to_string()], &ProgressTracker::new());
        assert!(matches!(result, Err(PipelineError::BaseDir(_))));
    }

    #[test]
    fn test_all_missing_files_halt_after_first_stage() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            base_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let tracker = ProgressTracker::new();
        let outcome = Pipeline::new(config)
            .run(&["missing/report.xlsx".to_string()], &tracker)
            .unwrap();

        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.halted_at.as_deref(), Some("remove_sheets"));
        assert_eq!(outcome.reports[0].errors.len(), 1);
        assert!(outcome.tables.is_empty());

        let snapshot = tracker.snapshot();
        assert!(snapshot.is_finished());
        assert!(snapshot.status_lines.iter().any(|l| l.starts_with("⚠️")));
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            base_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config);
        match pipeline.run_stage("no_such_stage", &[]) {
            Err(PipelineError::Config(message)) => {
                assert!(message.contains("no_such_stage"));
                assert!(message.contains("transpose"));
            }
            other => panic!("expected a config error, got {:?}", other.map(|r| r.stage)),
        }
        let names = pipeline.stage_names();
        assert_eq!(names.len(), 12);
        assert_eq!(names.first(), Some(&"remove_sheets"));
        assert_eq!(names.last(), Some(&"to_probability"));
    }
}
