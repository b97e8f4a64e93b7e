use super::{map_sheets, Stage, StageContext, StageResult};
use crate::constants::METADATA_MARKERS;
use crate::error::Result;
use crate::workbook::table::row_is_empty;
use crate::workbook::{Cell, Grid, Table, Workbook};

/// Stage 3: drop report boilerplate rows (survey name, base size, period...)
pub struct RemoveMetadataStage;

impl Stage for RemoveMetadataStage {
    fn name(&self) -> &'static str {
        "remove_metadata"
    }

    fn description(&self) -> &'static str {
        "Removing metadata rows"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |_, grid| Ok(remove_metadata(Table::from_grid(grid))))
    }
}

pub fn is_metadata_row(row: &[Cell]) -> bool {
    row.iter().any(|cell| {
        let text = cell.as_text();
        METADATA_MARKERS.iter().any(|marker| text.contains(marker))
    })
}

pub fn remove_metadata(mut table: Table) -> Table {
    table.rows.retain(|row| !is_metadata_row(row));
    table
}

/// Stage 4: collapse runs of blank rows to a single blank row
pub struct ReduceEmptyLinesStage;

impl Stage for ReduceEmptyLinesStage {
    fn name(&self) -> &'static str {
        "reduce_empty_lines"
    }

    fn description(&self) -> &'static str {
        "Reducing empty lines"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |_, grid: Grid| {
            Ok(reduce_empty_lines(Table::from_grid(grid)))
        })
    }
}

pub fn reduce_empty_lines(mut table: Table) -> Table {
    let mut previous_empty = false;
    table.rows.retain(|row| {
        let empty = row_is_empty(row);
        let keep = !(empty && previous_empty);
        previous_empty = empty;
        keep
    });
    table
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_metadata_rows_matched_by_substring() {
        let table = Table::new(
            labels(&["Topic", "Total"]),
            vec![
                vec![t("Survey Name: Bikes 2023"), e()],
                vec![t("Yes"), n(40.0)],
                vec![e(), t("Base n = 1,000")],
                vec![t("No"), n(60.0)],
                vec![t("Survey period: March"), e()],
            ],
        );
        let cleaned = remove_metadata(table);
        assert_eq!(cleaned.rows, vec![vec![t("Yes"), n(40.0)], vec![t("No"), n(60.0)]]);
    }

    #[test]
    fn test_header_labels_are_not_filtered() {
        let table = Table::new(labels(&["Population: adults", "Total"]), vec![vec![t("Yes"), n(1.0)]]);
        let cleaned = remove_metadata(table);
        assert_eq!(cleaned.columns[0], "Population: adults");
        assert_eq!(cleaned.rows.len(), 1);
    }

    #[test]
    fn test_blank_runs_collapse_to_one() {
        let table = Table::new(
            labels(&["a", "b"]),
            vec![
                vec![t("x"), n(1.0)],
                vec![e(), e()],
                vec![e(), t("  ")],
                vec![e(), e()],
                vec![t("y"), n(2.0)],
                vec![e(), e()],
                vec![t("z"), n(3.0)],
            ],
        );
        let reduced = reduce_empty_lines(table);
        assert_eq!(reduced.rows.len(), 5);
        for pair in reduced.rows.windows(2) {
            assert!(!(row_is_empty(&pair[0]) && row_is_empty(&pair[1])));
        }
        // isolated blank row survives
        assert!(row_is_empty(&reduced.rows[3]));
    }
}
