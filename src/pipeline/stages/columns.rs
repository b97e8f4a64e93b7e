use tracing::debug;

use super::{map_sheets, Stage, StageContext, StageResult};
use crate::constants::{PRUNED_COLUMN_MARKERS, PRUNED_ROW_MARKERS};
use crate::error::Result;
use crate::workbook::{Cell, Table, Workbook};

/// Stage 5: drop total/percentage/income columns and the demographic section rows
pub struct PruneDemographicsStage;

impl Stage for PruneDemographicsStage {
    fn name(&self) -> &'static str {
        "prune_demographics"
    }

    fn description(&self) -> &'static str {
        "Removing columns with 'Grand Total' and 'in %'"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |sheet, grid| {
            let table = Table::from_grid(grid);
            let (width, height) = (table.width(), table.height());
            let pruned = prune_demographics(table);
            debug!(
                file = ctx.file,
                sheet,
                "Pruned {} columns and {} rows",
                width - pruned.width(),
                height - pruned.height()
            );
            Ok(pruned)
        })
    }
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

fn cell_contains_any(cell: &Cell, markers: &[&str]) -> bool {
    contains_any(&cell.as_text(), markers)
}

/// Column and row filters are evaluated on the input table independently
pub fn prune_demographics(mut table: Table) -> Table {
    let dropped_columns: Vec<bool> = (0..table.width())
        .map(|c| {
            contains_any(&table.columns[c], PRUNED_COLUMN_MARKERS)
                || table
                    .column(c)
                    .any(|cell| cell_contains_any(cell, PRUNED_COLUMN_MARKERS))
        })
        .collect();
    let dropped_rows: Vec<bool> = table
        .rows
        .iter()
        .map(|row| row.iter().any(|cell| cell_contains_any(cell, PRUNED_ROW_MARKERS)))
        .collect();

    table.retain_columns(|c| !dropped_columns[c]);
    let mut flags = dropped_rows.into_iter();
    table.rows.retain(|_| !flags.next().unwrap_or(false));
    table
}
