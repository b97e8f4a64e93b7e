use tracing::debug;

use super::{Stage, StageContext, StageResult};
use crate::constants::REMOVED_SHEETS;
use crate::error::Result;
use crate::workbook::Workbook;

/// Stage 1: drop the cover/index sheets, keep every other grid untouched
pub struct RemoveSheetsStage;

impl Stage for RemoveSheetsStage {
    fn name(&self) -> &'static str {
        "remove_sheets"
    }

    fn description(&self) -> &'static str {
        "Removing Overview sheets"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        let before = workbook.sheets.len();
        let pruned = remove_sheets(workbook);
        debug!(
            file = ctx.file,
            "Removed {} of {} sheets",
            before - pruned.sheets.len(),
            before
        );
        Ok(StageResult::Workbook(pruned))
    }
}

pub fn remove_sheets(mut workbook: Workbook) -> Workbook {
    workbook
        .sheets
        .retain(|sheet| !REMOVED_SHEETS.contains(&sheet.name.as_str()));
    workbook
}
