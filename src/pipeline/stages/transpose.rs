use tracing::debug;

use super::{map_sheets, Stage, StageContext, StageResult};
use crate::error::Result;
use crate::workbook::{Cell, Table, Workbook};

/// Stage 9: swap rows and columns so options become columns
pub struct TransposeStage;

impl Stage for TransposeStage {
    fn name(&self) -> &'static str {
        "transpose"
    }

    fn description(&self) -> &'static str {
        "Transposing tables"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |sheet, grid| {
            let mut table = transpose(Table::from_grid(grid));
            if ctx.advanced {
                let width = table.width();
                drop_sparse_columns(&mut table, ctx.sparse_column_min_values);
                debug!(
                    file = ctx.file,
                    sheet,
                    "Dropped {} sparse columns",
                    width - table.width()
                );
            }
            Ok(table)
        })
    }
}

/// Each original column becomes a row led by its label
pub fn transpose(table: Table) -> Table {
    let Table { columns, rows } = table;
    if columns.is_empty() {
        return Table::default();
    }

    let mut labels = Vec::with_capacity(rows.len() + 1);
    labels.push("Index".to_string());
    labels.extend((1..=rows.len()).map(|i| format!("Column_{}", i)));

    let transposed = columns
        .into_iter()
        .enumerate()
        .map(|(j, label)| {
            let mut row = Vec::with_capacity(rows.len() + 1);
            row.push(Cell::Text(label));
            row.extend(rows.iter().map(|r| r.get(j).cloned().unwrap_or_default()));
            row
        })
        .collect();

    Table::new(labels, transposed)
}

/// Drop columns holding fewer than `min_values` non-empty cells
pub fn drop_sparse_columns(table: &mut Table, min_values: usize) {
    let counts: Vec<usize> = (0..table.width())
        .map(|c| table.column(c).filter(|cell| !cell.is_empty()).count())
        .collect();
    table.retain_columns(|c| counts[c] >= min_values);
}
