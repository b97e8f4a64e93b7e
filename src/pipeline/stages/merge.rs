use tracing::debug;

use super::{Stage, StageContext, StageResult};
use crate::constants::{Gender, MERGED_SHEET};
use crate::error::Result;
use crate::workbook::table::row_is_empty;
use crate::workbook::{Cell, Grid, Sheet, Workbook};

/// Stage 7: stack every sheet into a single "Merged Data" sheet
pub struct MergeSheetsStage;

impl Stage for MergeSheetsStage {
    fn name(&self) -> &'static str {
        "merge_sheets"
    }

    fn description(&self) -> &'static str {
        "Merging sheets"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        let sheet_count = workbook.sheets.len();
        let merged = merge_sheets(workbook);
        debug!(
            file = ctx.file,
            "Merged {} sheets into {} rows",
            sheet_count,
            merged.sheets.first().map_or(0, |s| s.grid.len())
        );
        Ok(StageResult::Workbook(merged))
    }
}

fn is_gender_cell(cell: Option<&Cell>) -> bool {
    cell.and_then(Cell::as_str).and_then(Gender::parse).is_some()
}

pub fn merge_sheets(workbook: Workbook) -> Workbook {
    let mut rows: Grid = Vec::new();
    for sheet in workbook.sheets {
        rows.push(Vec::new());
        rows.extend(sheet.grid);
    }
    if !rows.is_empty() {
        rows.remove(0);
    }

    // sub-headers duplicated by stacking sit right above a gender header row
    let mut delete = vec![false; rows.len()];
    for i in 1..rows.len() {
        if is_gender_cell(rows[i].get(1)) && !row_is_empty(&rows[i - 1]) {
            delete[i - 1] = true;
        }
    }
    let mut flags = delete.into_iter();
    rows.retain(|_| !flags.next().unwrap_or(false));

    Workbook::new(vec![Sheet::new(MERGED_SHEET, rows)])
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_sheets_stacked_with_separator() {
        let workbook = Workbook::new(vec![
            Sheet::new("A", vec![vec![t("Topic"), t("Total")], vec![t("Yes"), n(1.0)]]),
            Sheet::new("B", vec![vec![t("Topic"), t("Total")], vec![t("No"), n(2.0)]]),
        ]);
        let merged = merge_sheets(workbook);

        assert_eq!(merged.sheet_names(), vec![MERGED_SHEET]);
        let grid = &merged.sheets[0].grid;
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0][0], t("Topic"));
        assert!(grid[2].is_empty());
        assert_eq!(grid[4][0], t("No"));
    }

    #[test]
    fn test_row_above_gender_header_removed() {
        let workbook = Workbook::new(vec![Sheet::new(
            "A",
            vec![
                vec![t("Unnamed: 0"), t("Female"), t("Male")],
                vec![t("Yes"), n(4.0), n(6.0)],
                vec![t("Repeated title"), e(), e()],
                vec![e(), t("Female"), t("Male")],
                vec![t("No"), n(6.0), n(4.0)],
            ],
        )]);
        let grid = merge_sheets(workbook).sheets.remove(0).grid;

        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0][1], t("Female"));
        assert_eq!(grid[2][1], t("Female"));
    }

    #[test]
    fn test_empty_workbook_yields_empty_merged_sheet() {
        let merged = merge_sheets(Workbook::default());
        assert_eq!(merged.sheets.len(), 1);
        assert!(merged.sheets[0].grid.is_empty());
    }
}
