use super::{map_sheets, FileScope, Stage, StageContext, StageResult};
use crate::constants::{is_superscript, Gender, AGE_RANGE_MARKER};
use crate::error::Result;
use crate::workbook::{Cell, Table, Workbook};

/// Stage 11: keep only the option row plus gender and age-range rows of advanced files
pub struct FilterAdvancedStage;

impl Stage for FilterAdvancedStage {
    fn name(&self) -> &'static str {
        "filter_advanced"
    }

    fn description(&self) -> &'static str {
        "Filtering advanced files"
    }

    fn scope(&self) -> FileScope {
        FileScope::AdvancedOnly
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |_, grid| {
            Ok(filter_demographics(Table::from_grid(grid)))
        })
    }
}

pub fn strip_superscripts(text: &str) -> String {
    text.chars().filter(|c| !is_superscript(*c)).collect()
}

fn is_demographic_row(row: &[Cell]) -> bool {
    let Some(first) = row.first().and_then(Cell::as_str) else {
        return false;
    };
    Gender::parse(first).is_some() || first.contains(AGE_RANGE_MARKER)
}

pub fn filter_demographics(mut table: Table) -> Table {
    for cell in table.rows.iter_mut().flatten() {
        if let Cell::Text(text) = cell {
            if text.chars().any(is_superscript) {
                *text = strip_superscripts(text.as_str());
            }
        }
    }

    let mut rows = table.rows.into_iter();
    let mut kept: Vec<Vec<Cell>> = rows.next().into_iter().collect();
    kept.extend(rows.filter(|row| is_demographic_row(row)));
    table.rows = kept;
    table
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_keeps_first_row_and_demographic_rows() {
        let table = Table::new(
            labels(&["Index", "Column_1", "Column_2"]),
            vec![
                vec![t("Topic"), t("Q_ Base"), t("Q_Yes")],
                vec![t("Female"), n(100.0), n(40.0)],
                vec![t("Male"), n(100.0), n(60.0)],
                vec![t("North region"), n(50.0), n(20.0)],
                vec![t("18-29 years²"), n(100.0), n(25.0)],
                vec![t("female"), n(1.0), n(1.0)],
            ],
        );
        let filtered = filter_demographics(table);
        let firsts: Vec<_> = filtered.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            firsts,
            vec![t("Topic"), t("Female"), t("Male"), t("18-29 years"), t("female")]
        );
    }

    #[test]
    fn test_superscripts_stripped_everywhere() {
        assert_eq!(strip_superscripts("Q_Yes¹ ³"), "Q_Yes ");
        let table = Table::new(labels(&["Index"]), vec![vec![t("Topic⁴")]]);
        assert_eq!(filter_demographics(table).rows[0][0], t("Topic"));
    }

    #[test]
    fn test_scope_is_advanced_only() {
        assert_eq!(FilterAdvancedStage.scope(), FileScope::AdvancedOnly);
    }
}
