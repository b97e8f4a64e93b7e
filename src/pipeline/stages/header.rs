use super::{map_sheets, Stage, StageContext, StageResult};
use crate::error::Result;
use crate::workbook::table::label_of;
use crate::workbook::{Cell, Grid, Table, Workbook};

/// Stage 2: cut the report preamble and promote the first numeric row to the header
pub struct StripHeaderStage;

impl Stage for StripHeaderStage {
    fn name(&self) -> &'static str {
        "strip_header"
    }

    fn description(&self) -> &'static str {
        "Removing header rows and empty columns"
    }

    fn skips_advanced(&self) -> bool {
        true
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |_, grid| Ok(strip_header(grid)))
    }
}

/// Rows before the first row holding a numeric cell are discarded and that row
/// becomes the header. A sheet without any numeric cell has no table and comes out empty.
pub fn strip_header(grid: Grid) -> Table {
    let start = match grid.iter().position(|row| row.iter().any(Cell::is_number)) {
        Some(start) => start,
        None => return Table::default(),
    };

    let mut rows = grid.into_iter().skip(start);
    let header = rows.next().unwrap_or_default();
    let rows: Vec<Vec<Cell>> = rows.collect();

    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let occupied = |c: usize| {
        header.get(c).is_some_and(|cell| !cell.is_empty())
            || rows
                .iter()
                .any(|row| row.get(c).is_some_and(|cell| !cell.is_empty()))
    };
    let kept: Vec<usize> = (0..width).filter(|&c| occupied(c)).collect();

    let columns = kept
        .iter()
        .enumerate()
        .map(|(position, &c)| match header.get(c) {
            Some(cell) if !cell.is_empty() => label_of(cell),
            _ => format!("Column_{}", position),
        })
        .collect();

    let rows = rows
        .into_iter()
        .map(|row| {
            kept.iter()
                .map(|&c| row.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    Table::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_strips_preamble_and_promotes_numeric_row() {
        let grid = vec![
            vec![t("Statista report"), e(), e(), e()],
            vec![t("Survey period: 2023"), e(), e(), e()],
            vec![t("Total"), n(2022.0), e(), n(2023.0)],
            vec![t("Yes"), n(10.0), e(), n(12.0)],
            vec![e(), n(5.0), e(), e()],
        ];
        let table = strip_header(grid);

        assert_eq!(table.columns, labels(&["Total", "2022", "2023"]));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec![t("Yes"), n(10.0), n(12.0)]);
    }

    #[test]
    fn test_missing_header_cells_get_positional_labels() {
        let grid = vec![
            vec![e(), n(1.0), t("Female")],
            vec![t("Yes"), n(3.0), n(4.0)],
        ];
        let table = strip_header(grid);
        assert_eq!(table.columns, labels(&["Column_0", "1", "Female"]));
    }

    #[test]
    fn test_sheet_without_numbers_is_empty() {
        let grid = vec![vec![t("Overview text")], vec![t("more text")]];
        let table = strip_header(grid);
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_stage_skips_advanced_files() {
        assert!(StripHeaderStage.skips_advanced());
    }
}
