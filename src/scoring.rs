//! Advisory transformability score for downloaded reports.
//!
//! Rewards workbooks that carry the usual overview/demographics sheets and data sheets
//! whose first row under the header is broken down by age or gender.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{SCORE_LOOKUP_COLUMNS, SCORE_LOOKUP_SHEETS};
use crate::error::Result;
use crate::workbook::{read_workbook, Workbook};

const SHEET_INCREMENT: f64 = 1.0;
const COLUMN_INCREMENT: f64 = 0.5;
/// Lookup sheets a well-formed report is expected to carry at most
const LOOKUP_ALLOWANCE: usize = 3;

/// Score one workbook on disk; roughly in [0, 1]
pub fn score(path: &Path) -> Result<f64> {
    let workbook = read_workbook(path)?;
    let value = score_workbook(&workbook);
    debug!(file = %path.display(), score = value, "Scored workbook");
    Ok(value)
}

pub fn score_workbook(workbook: &Workbook) -> f64 {
    let mut sheet_score = 0.0;
    let mut column_score = 0.0;

    for sheet in &workbook.sheets {
        if SCORE_LOOKUP_SHEETS.contains(&sheet.name.to_lowercase().as_str()) {
            sheet_score += SHEET_INCREMENT;
            continue;
        }

        let Some(row) = sheet.grid.get(1) else {
            continue;
        };
        let matches = row
            .iter()
            .filter_map(|cell| cell.as_str())
            .filter(|text| {
                let lower = text.to_lowercase();
                SCORE_LOOKUP_COLUMNS.iter().any(|prefix| lower.starts_with(prefix))
            })
            .count();
        column_score += COLUMN_INCREMENT * matches as f64;
    }

    // every sheet beyond the lookup allowance counts as a data sheet
    let data_sheets = workbook.sheets.len().saturating_sub(LOOKUP_ALLOWANCE);
    let column_part = if data_sheets == 0 {
        0.0
    } else {
        column_score / data_sheets as f64
    };
    (sheet_score / LOOKUP_ALLOWANCE as f64 + column_part) / 2.0
}

/// Average score over an operator's selection
#[derive(Debug, Clone, Serialize)]
pub struct SelectionScore {
    pub files: Vec<(PathBuf, f64)>,
    pub average: f64,
}

impl fmt::Display for SelectionScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.files.len();
        if count == 0 {
            return write!(f, "0 files selected.");
        }
        let noun = if count == 1 { "file" } else { "files" };
        write!(f, "{:.1}% ({} {})", self.average * 100.0, count, noun)
    }
}

/// Unreadable files count as zero
pub fn score_selection(paths: &[PathBuf]) -> SelectionScore {
    let files: Vec<(PathBuf, f64)> = paths
        .iter()
        .map(|path| {
            let value = score(path).unwrap_or_else(|e| {
                warn!(file = %path.display(), "⚠️ Could not score workbook: {}", e);
                0.0
            });
            (path.clone(), value)
        })
        .collect();

    let average = if files.is_empty() {
        0.0
    } else {
        files.iter().map(|(_, v)| v).sum::<f64>() / files.len() as f64
    };
    SelectionScore { files, average }
}
