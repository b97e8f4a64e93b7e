use super::{map_sheets, Stage, StageContext, StageResult};
use crate::constants::{Gender, TOPIC_COLUMN, UNNAMED_FIRST_COLUMN};
use crate::error::Result;
use crate::workbook::table::row_is_empty;
use crate::workbook::{Cell, Table, Workbook};

/// Stage 8: remove blank rows and header rows re-injected by the merge
pub struct JoinTablesStage;

impl Stage for JoinTablesStage {
    fn name(&self) -> &'static str {
        "join_tables"
    }

    fn description(&self) -> &'static str {
        "Joining tables"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |_, grid| Ok(join_tables(Table::from_grid(grid))))
    }
}

fn has_both_genders<'c>(cells: impl Iterator<Item = &'c str>) -> bool {
    let (mut female, mut male) = (false, false);
    for cell in cells {
        match Gender::parse(cell) {
            Some(Gender::Female) => female = true,
            Some(Gender::Male) => male = true,
            None => {}
        }
    }
    female && male
}

fn is_gender_header_row(row: &[Cell]) -> bool {
    has_both_genders(row.iter().filter_map(Cell::as_str))
}

pub fn join_tables(mut table: Table) -> Table {
    table.rows.retain(|row| !row_is_empty(row));

    if let Some(first) = table.rows.first().cloned() {
        let mut seen_first = false;
        table.rows.retain(|row| {
            if *row != first {
                return true;
            }
            let keep = !seen_first;
            seen_first = true;
            keep
        });
    }

    // one copy of the gender header row survives, moved to the end
    let gender_row = table.rows.iter().find(|row| is_gender_header_row(row)).cloned();
    if let Some(row) = gender_row {
        table.rows.retain(|row| !is_gender_header_row(row));
        table.rows.push(row);
    }

    for column in &mut table.columns {
        if column == UNNAMED_FIRST_COLUMN {
            *column = TOPIC_COLUMN.to_string();
        }
    }
    table
}
