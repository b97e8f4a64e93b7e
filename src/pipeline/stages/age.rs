use super::{map_sheets, Stage, StageContext, StageResult};
use crate::constants::GENERATIONS;
use crate::error::Result;
use crate::workbook::{Cell, Table, Workbook};

/// Stage 10: rewrite generation labels as age ranges for the current year
pub struct MapAgeStage;

impl Stage for MapAgeStage {
    fn name(&self) -> &'static str {
        "map_age"
    }

    fn description(&self) -> &'static str {
        "Mapping age categories"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        let year = ctx.current_year;
        map_sheets(workbook, ctx, |_, grid| Ok(map_ages(Table::from_grid(grid), year)))
    }
}

/// "Gen Z (1995-2012)" in 2025 -> "13-30 years"
pub fn generation_to_age(label: &str, current_year: i32) -> Option<String> {
    let label = label.trim();
    GENERATIONS
        .iter()
        .find(|(name, _, _)| *name == label)
        .map(|(_, born_from, born_to)| {
            format!("{}-{} years", current_year - born_to, current_year - born_from)
        })
}

pub fn map_ages(mut table: Table, current_year: i32) -> Table {
    for cell in table.rows.iter_mut().flatten() {
        if let Some(age) = cell.as_str().and_then(|s| generation_to_age(s, current_year)) {
            *cell = Cell::Text(age);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_generation_to_age() {
        assert_eq!(generation_to_age("Gen Z (1995-2012)", 2025).as_deref(), Some("13-30 years"));
        assert_eq!(
            generation_to_age(" Baby Boomers (1946-1964) ", 2025).as_deref(),
            Some("61-79 years")
        );
        assert_eq!(generation_to_age("Mileniálové (1980-1994)", 2024).as_deref(), Some("30-44 years"));
        assert_eq!(generation_to_age("Gen Z", 2025), None);
    }

    #[test]
    fn test_map_ages_cellwise() {
        let table = Table::new(
            labels(&["Index", "Column_1"]),
            vec![
                vec![t("Gen X (1965-1979)"), n(10.0)],
                vec![t("Female"), t("Generation Z (1995-2012)")],
            ],
        );
        let mapped = map_ages(table, 2025);
        assert_eq!(mapped.rows[0], vec![t("46-60 years"), n(10.0)]);
        assert_eq!(mapped.rows[1][1], t("13-30 years"));
        assert_eq!(mapped.rows[1][0], t("Female"));
    }
}
