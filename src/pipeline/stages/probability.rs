use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use super::{apply_policy, FailurePolicy, FileScope, Stage, StageContext, StageResult};
use crate::constants::{Gender, AGE_RANGE_MARKER, BASE_COLUMN_MARKER};
use crate::error::{PipelineError, Result};
use crate::workbook::{parse_number, Grid, Table, Workbook};

/// One gender/age line of the final demographic table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityRow {
    pub gender: Gender,
    pub age: String,
    /// One value per option column; `None` where the source was missing or the base was zero
    pub values: Vec<Option<f64>>,
}

/// Final `gender, age, <options...>` table of an advanced file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbabilityTable {
    pub options: Vec<String>,
    pub rows: Vec<ProbabilityRow>,
}

impl ProbabilityTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, gender: Gender, age: &str, option: &str) -> Option<f64> {
        let column = self.options.iter().position(|o| o == option)?;
        self.rows
            .iter()
            .find(|row| row.gender == gender && row.age == age)
            .and_then(|row| row.values.get(column).copied().flatten())
    }

    /// Append another sheet's rows, widening to the union of options
    pub fn extend(&mut self, other: ProbabilityTable) {
        let positions: Vec<usize> = other
            .options
            .into_iter()
            .map(|option| match self.options.iter().position(|o| *o == option) {
                Some(i) => i,
                None => {
                    self.options.push(option);
                    self.options.len() - 1
                }
            })
            .collect();

        let width = self.options.len();
        for row in &mut self.rows {
            row.values.resize(width, None);
        }
        for row in other.rows {
            let mut values = vec![None; width];
            for (value, &position) in row.values.into_iter().zip(&positions) {
                values[position] = value;
            }
            self.rows.push(ProbabilityRow {
                gender: row.gender,
                age: row.age,
                values,
            });
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["gender", "age"];
        header.extend(self.options.iter().map(String::as_str));
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.gender.as_str().to_string(), row.age.clone()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Stage 12: base-normalize option counts and split age groups by gender
pub struct ProbabilityStage;

impl Stage for ProbabilityStage {
    fn name(&self) -> &'static str {
        "to_probability"
    }

    fn description(&self) -> &'static str {
        "Transforming to probability"
    }

    fn policy(&self) -> FailurePolicy {
        FailurePolicy::AbortFileOnError
    }

    fn scope(&self) -> FileScope {
        FileScope::AdvancedOnly
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        let mut combined = ProbabilityTable::default();
        for sheet in workbook.sheets {
            let result = sheet_probabilities(ctx.file, &sheet.name, sheet.grid);
            if let Some(Some(table)) = apply_policy(ctx, &sheet.name, result)? {
                debug!(
                    file = ctx.file,
                    sheet = %sheet.name,
                    "Normalized {} options into {} rows",
                    table.options.len(),
                    table.rows.len()
                );
                combined.extend(table);
            }
        }

        if combined.is_empty() {
            return Err(PipelineError::Layout(
                "no sheet holds gender and age rows".to_string(),
            ));
        }
        Ok(StageResult::Probabilities(combined))
    }
}

/// Normalize one sheet. The grid's second row holds the option labels.
/// Returns `None` for a sheet without data rows.
pub fn sheet_probabilities(file: &str, sheet: &str, grid: Grid) -> Result<Option<ProbabilityTable>> {
    if grid.len() < 2 {
        return Ok(None);
    }
    let mut table = Table::from_grid(grid.into_iter().skip(1).collect());
    if table.is_empty() || table.width() < 2 {
        return Ok(None);
    }

    let numeric: Vec<bool> = table
        .columns
        .iter()
        .enumerate()
        .map(|(c, label)| c > 0 && parse_number(label).is_some())
        .collect();
    table.retain_columns(|c| !numeric[c]);

    let labels: Vec<String> = table.column(0).map(|c| c.as_text().trim().to_string()).collect();
    let mut options: Vec<String> = table.columns[1..].to_vec();
    let mut values: Vec<Vec<Option<f64>>> = table
        .rows
        .iter()
        .map(|row| row[1..].iter().map(|c| c.to_number()).collect())
        .collect();

    normalize_by_base(file, sheet, &options, &mut values);

    let is_base: Vec<bool> = options.iter().map(|o| o.contains(BASE_COLUMN_MARKER)).collect();
    let mut flags = is_base.iter();
    options.retain(|_| !flags.next().copied().unwrap_or(false));
    for row in &mut values {
        let mut flags = is_base.iter();
        row.retain(|_| !flags.next().copied().unwrap_or(false));
    }

    let (female, male) = gender_rows(sheet, &labels)?;
    let mut rows = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        if i == female || i == male {
            continue;
        }
        let age = label.replace(&format!(" {}", AGE_RANGE_MARKER), "");
        let (female_values, male_values) = split_by_gender(&values[i], &values[female], &values[male]);
        rows.push(ProbabilityRow {
            gender: Gender::Female,
            age: age.clone(),
            values: female_values,
        });
        rows.push(ProbabilityRow {
            gender: Gender::Male,
            age,
            values: male_values,
        });
    }

    Ok(Some(ProbabilityTable { options, rows }))
}

/// Divide each option column by the base column that precedes it
fn normalize_by_base(file: &str, sheet: &str, options: &[String], values: &mut [Vec<Option<f64>>]) {
    let mut base: Option<usize> = None;
    for (c, option) in options.iter().enumerate() {
        if option.contains(BASE_COLUMN_MARKER) {
            base = Some(c);
            continue;
        }
        let Some(b) = base else {
            continue;
        };

        let mut zero_base = false;
        for row in values.iter_mut() {
            row[c] = match (row[c], row[b]) {
                (Some(v), Some(d)) if d != 0.0 => Some(v / d),
                (Some(_), _) => {
                    zero_base = true;
                    None
                }
                (None, _) => None,
            };
        }
        if zero_base {
            warn!(
                file,
                sheet,
                "⚠️ Zero or missing base '{}' for column '{}', values left empty",
                options[b],
                option
            );
        }
    }
}

/// Row indices of the female and male proportion rows.
/// Falls back to the first two rows when the labels carry no gender token.
fn gender_rows(sheet: &str, labels: &[String]) -> Result<(usize, usize)> {
    let female = labels.iter().position(|l| Gender::parse(l) == Some(Gender::Female));
    let male = labels.iter().position(|l| Gender::parse(l) == Some(Gender::Male));
    match (female, male) {
        (Some(f), Some(m)) => Ok((f, m)),
        (None, None) if labels.len() >= 2 => Ok((0, 1)),
        _ => Err(PipelineError::sheet(sheet, "missing female/male proportion rows")),
    }
}

/// Split an age-group probability between female and male so the pair sums back to it
pub fn split_by_gender(
    age: &[Option<f64>],
    female: &[Option<f64>],
    male: &[Option<f64>],
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    age.iter()
        .enumerate()
        .map(|(j, p)| {
            let Some(p) = *p else {
                return (None, None);
            };
            let share = match (female.get(j).copied().flatten(), male.get(j).copied().flatten()) {
                (Some(f), Some(m)) if f + m > 0.0 => f / (f + m),
                _ => 0.5,
            };
            (Some(p * share), Some(p * (1.0 - share)))
        })
        .unzip()
}
