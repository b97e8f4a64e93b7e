// Cell/sheet/workbook model shared by every stage, plus .xlsx I/O

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};

pub mod table;

pub use table::Table;

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

/// Row-major cell grid; rows may be ragged
pub type Grid = Vec<Vec<Cell>>;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Missing values and whitespace-only text both count as empty
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(n) if !n.is_nan())
    }

    /// String form used for substring matching; empty cells render as ""
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Number(n) => Cow::Owned(format_number(*n)),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric coercion; text that does not parse becomes `None`
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if !n.is_nan() => Some(*n),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// Render a number the way a spreadsheet shows it: integral values without ".0"
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse report-style numbers: thousands separators, decimal comma, trailing percent
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.contains(',') {
        if cleaned.contains('.') {
            cleaned = cleaned.replace(',', "");
        } else {
            cleaned = cleaned.replace(',', ".");
        }
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A named sheet holding its raw grid (header row included as plain data)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
}

impl Sheet {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }
}

/// Ordered collection of sheets loaded fully into memory
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Load every sheet of a workbook; absolute cell positions are preserved
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut reader = open_workbook_auto(path)?;
    let sheet_names = reader.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = reader.worksheet_range(&name)?;
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut grid: Grid = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(convert_cell));
            grid.push(cells);
        }
        debug!("Read sheet '{}' ({} rows) from {}", name, grid.len(), path.display());
        sheets.push(Sheet { name, grid });
    }

    Ok(Workbook { sheets })
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}

/// Write a workbook with every grid copied verbatim.
/// A workbook without sheets is saved with one blank default sheet.
pub fn write_workbook(path: &Path, workbook: &Workbook) -> Result<()> {
    let mut xlsx = XlsxWorkbook::new();

    if workbook.sheets.is_empty() {
        xlsx.add_worksheet();
    }

    for sheet in &workbook.sheets {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(sheet.name.as_str())?;

        for (r, row) in sheet.grid.iter().enumerate() {
            let row_num = u32::try_from(r)
                .map_err(|_| PipelineError::sheet(&sheet.name, "too many rows"))?;
            for (c, cell) in row.iter().enumerate() {
                let col_num = u16::try_from(c)
                    .map_err(|_| PipelineError::sheet(&sheet.name, "too many columns"))?;
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) if n.is_finite() => {
                        worksheet.write_number(row_num, col_num, *n)?;
                    }
                    Cell::Number(_) => {}
                    Cell::Text(s) if s.is_empty() => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col_num, s.as_str())?;
                    }
                }
            }
        }
    }

    xlsx.save(path)?;
    Ok(())
}

/// Write header-bearing tables, one sheet per entry, header row included
pub fn write_tables(path: &Path, tables: &[(String, Table)]) -> Result<()> {
    let workbook = Workbook {
        sheets: tables
            .iter()
            .map(|(name, table)| Sheet::new(name.clone(), table.to_grid()))
            .collect(),
    };
    write_workbook(path, &workbook)
}
