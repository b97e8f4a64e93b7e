use std::collections::{HashMap, HashSet};

use super::{format_number, Cell, Grid};

/// Header-bearing view of a sheet: the first grid row becomes the column labels.
///
/// Every row is padded to `columns.len()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self { columns, rows };
        table.pad_rows();
        table
    }

    /// Promote the first grid row to labels.
    ///
    /// Blank labels become `Unnamed: <i>` and repeated labels get `.1`, `.2`, ...
    pub fn from_grid(grid: Grid) -> Self {
        let mut rows = grid.into_iter();
        let header = match rows.next() {
            Some(header) => header,
            None => return Table::default(),
        };
        let rows: Vec<Vec<Cell>> = rows.collect();

        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let labels = (0..width)
            .map(|i| match header.get(i) {
                Some(cell) if !cell.is_empty() => label_of(cell),
                _ => format!("Unnamed: {}", i),
            })
            .collect();

        Table::new(dedupe_labels(labels), rows)
    }

    /// Re-emit the header row followed by the data rows
    pub fn to_grid(&self) -> Grid {
        if self.columns.is_empty() && self.rows.is_empty() {
            return Vec::new();
        }
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.columns.iter().map(|c| Cell::text(c.as_str())).collect());
        grid.extend(self.rows.iter().cloned());
        grid
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Keep only the columns whose index satisfies `keep`
    pub fn retain_columns<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let kept: Vec<usize> = (0..self.width()).filter(|&i| keep(i)).collect();
        if kept.len() == self.width() {
            return;
        }
        self.columns = kept.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = kept.iter().map(|&i| std::mem::take(&mut row[i])).collect();
        }
    }

    fn pad_rows(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Cell::Empty);
        }
    }
}

/// True when every cell of the row is empty
pub fn row_is_empty(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_empty)
}

/// Header label for a cell: numbers without a trailing ".0", text trimmed
pub(crate) fn label_of(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => format_number(*n),
        other => other.as_text().trim().to_string(),
    }
}

/// pandas-style disambiguation of repeated column labels
fn dedupe_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = labels.iter().cloned().collect();
    let mut out = Vec::with_capacity(labels.len());

    for label in labels {
        let count = seen.entry(label.clone()).or_insert(0);
        if *count == 0 {
            *count = 1;
            out.push(label);
            continue;
        }

        let mut candidate = format!("{}.{}", label, count);
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{}.{}", label, count);
        }
        *count += 1;
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_grid_labels_blank_and_duplicate_headers() {
        let grid = vec![
            vec![Cell::Empty, Cell::text("Total"), Cell::text("Total"), Cell::Number(2021.0)],
            vec![Cell::text("Yes"), Cell::Number(1.0)],
        ];
        let table = Table::from_grid(grid);
        assert_eq!(
            table.columns,
            vec!["Unnamed: 0", "Total", "Total.1", "2021"]
        );
        assert_eq!(table.rows[0].len(), 4);
        assert_eq!(table.rows[0][3], Cell::Empty);
    }

    #[test]
    fn test_to_grid_restores_header_row() {
        let table = Table::new(
            vec!["Topic".to_string(), "Male".to_string()],
            vec![vec![Cell::text("Yes"), Cell::Number(3.0)]],
        );
        let grid = table.to_grid();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0][1], Cell::text("Male"));
        assert_eq!(Table::from_grid(grid), table);
    }

    #[test]
    fn test_retain_columns() {
        let mut table = Table::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)]],
        );
        table.retain_columns(|i| i != 1);
        assert_eq!(table.columns, vec!["a", "c"]);
        assert_eq!(table.rows[0], vec![Cell::Number(1.0), Cell::Number(3.0)]);
    }

    #[test]
    fn test_empty_grid() {
        let table = Table::from_grid(Vec::new());
        assert!(table.is_empty());
        assert!(table.to_grid().is_empty());
    }
}
