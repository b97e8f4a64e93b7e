use serde::Serialize;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::workbook::{Grid, Table, Workbook};

/// Common trait for all cleaning stages
pub trait Stage: Send + Sync {
    /// Short machine name used in logs and reports
    fn name(&self) -> &'static str;

    /// Human-readable description used for progress lines
    fn description(&self) -> &'static str;

    /// How a failing sheet affects the file it belongs to
    fn policy(&self) -> FailurePolicy {
        FailurePolicy::SkipOnError
    }

    /// Which files of the incoming list this stage handles at all
    fn scope(&self) -> FileScope {
        FileScope::All
    }

    /// Advanced files pass through untouched when this returns true
    fn skips_advanced(&self) -> bool {
        false
    }

    /// Transform one fully loaded workbook
    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult>;
}

/// Per-file information handed to a stage's transform
#[derive(Debug, Clone)]
pub struct StageContext<'a> {
    /// Relative path of the file being transformed
    pub file: &'a str,
    /// Whether the file is an advanced report
    pub advanced: bool,
    /// Failure policy in force for this stage
    pub policy: FailurePolicy,
    /// Calendar year used for generation-to-age arithmetic
    pub current_year: i32,
    /// Noise threshold for transposed columns of advanced files
    pub sparse_column_min_values: usize,
}

/// Tagged transform output; the runner writes each variant its own way
#[derive(Debug, Clone)]
pub enum StageResult {
    /// Grids saved verbatim, workbook structure preserved
    Workbook(Workbook),
    /// Header-bearing tables written one sheet per entry
    Sheets(Vec<(String, Table)>),
    /// Final demographic table written as CSV, replacing the source workbook
    Probabilities(probability::ProbabilityTable),
}

/// Strategy for a sheet that fails to transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailurePolicy {
    /// Log the sheet failure, drop the sheet and keep the file
    SkipOnError,
    /// Fail the whole file so no partial output is produced
    AbortFileOnError,
}

/// Subset of the incoming file list a stage works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileScope {
    All,
    AdvancedOnly,
}

/// Apply the stage's failure policy to one sheet result
pub fn apply_policy<T>(ctx: &StageContext<'_>, sheet: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match ctx.policy {
            FailurePolicy::SkipOnError => {
                warn!(file = ctx.file, sheet, "⚠️ Dropping sheet after error: {}", e);
                Ok(None)
            }
            FailurePolicy::AbortFileOnError => Err(match e {
                PipelineError::Sheet { .. } => e,
                other => PipelineError::sheet(sheet, other.to_string()),
            }),
        },
    }
}

/// Run a per-sheet transform over every sheet, honouring the failure policy
pub fn map_sheets<F>(workbook: Workbook, ctx: &StageContext<'_>, mut f: F) -> Result<StageResult>
where
    F: FnMut(&str, Grid) -> Result<Table>,
{
    let mut tables = Vec::with_capacity(workbook.sheets.len());
    for sheet in workbook.sheets {
        let result = f(&sheet.name, sheet.grid);
        if let Some(table) = apply_policy(ctx, &sheet.name, result)? {
            tables.push((sheet.name, table));
        }
    }
    Ok(StageResult::Sheets(tables))
}

pub mod age;
pub mod columns;
pub mod demographics;
pub mod header;
pub mod join;
pub mod merge;
pub mod metadata;
pub mod probability;
pub mod prune;
pub mod questions;
pub mod transpose;

pub use age::MapAgeStage;
pub use columns::PruneDemographicsStage;
pub use demographics::FilterAdvancedStage;
pub use header::StripHeaderStage;
pub use join::JoinTablesStage;
pub use merge::MergeSheetsStage;
pub use metadata::{ReduceEmptyLinesStage, RemoveMetadataStage};
pub use probability::{ProbabilityRow, ProbabilityStage, ProbabilityTable};
pub use prune::RemoveSheetsStage;
pub use questions::{
    default_question_matchers, AppendQuestionsStage, QuestionMatcher, RegexQuestionMatcher,
};
pub use transpose::TransposeStage;

/// The twelve cleaning stages in their fixed order
pub fn default_stages(config: &PipelineConfig) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(RemoveSheetsStage),
        Box::new(StripHeaderStage),
        Box::new(RemoveMetadataStage),
        Box::new(ReduceEmptyLinesStage),
        Box::new(PruneDemographicsStage),
        Box::new(AppendQuestionsStage::with_patterns(&config.question_patterns)),
        Box::new(MergeSheetsStage),
        Box::new(JoinTablesStage),
        Box::new(TransposeStage),
        Box::new(MapAgeStage),
        Box::new(FilterAdvancedStage),
        Box::new(ProbabilityStage),
    ]
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::workbook::Sheet;

    #[test]
    fn test_default_stage_order() {
        let names: Vec<&str> = default_stages(&PipelineConfig::default())
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "remove_sheets",
                "strip_header",
                "remove_metadata",
                "reduce_empty_lines",
                "prune_demographics",
                "append_questions",
                "merge_sheets",
                "join_tables",
                "transpose",
                "map_age",
                "filter_advanced",
                "to_probability",
            ]
        );
    }

    #[test]
    fn test_map_sheets_skip_policy_drops_failing_sheet() {
        let workbook = Workbook::new(vec![
            Sheet::new("Good", vec![vec![t("a")]]),
            Sheet::new("Bad", vec![vec![t("b")]]),
        ]);
        let result = map_sheets(workbook, &ctx(false), |name, grid| {
            if name == "Bad" {
                Err(PipelineError::sheet(name, "boom"))
            } else {
                Ok(Table::from_grid(grid))
            }
        })
        .unwrap();

        match result {
            StageResult::Sheets(tables) => {
                assert_eq!(tables.len(), 1);
                assert_eq!(tables[0].0, "Good");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_map_sheets_abort_policy_fails_file() {
        let workbook = Workbook::new(vec![Sheet::new("Bad", vec![vec![t("b")]])]);
        let mut context = ctx(true);
        context.policy = FailurePolicy::AbortFileOnError;
        let result = map_sheets(workbook, &context, |name, _| {
            Err(PipelineError::Layout(format!("{} is malformed", name)))
        });
        assert!(matches!(result, Err(PipelineError::Sheet { .. })));
    }
}
