// Loosely-typed tabular snapshot.
//
// Spreadsheet exports arrive as rows of untyped strings whose headers drift
// between snapshots, so the aggregation code works on named columns of
// `Cell`s instead of a fixed record struct. Every transformation returns a
// new `Table`; nothing is mutated behind a shared reference.
use crate::util::parse_f64_safe;
use std::cmp::Ordering;
use std::fmt;

/// A single value in a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Numeric view of the cell. Text is parsed with the forgiving parser,
    /// so `"1,234"` is a number and `"n/a"` is not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Number(_) | Cell::Missing => None,
            Cell::Text(s) => parse_f64_safe(Some(s.as_str())),
        }
    }

    /// `true` when the cell holds something other than a missing marker or
    /// blank text.
    pub fn is_present(&self) -> bool {
        match self {
            Cell::Missing => false,
            Cell::Text(s) => !s.trim().is_empty(),
            Cell::Number(n) => !n.is_nan(),
        }
    }

    /// Grouping key for the cell, or `None` when the row cannot be grouped.
    pub fn key(&self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        Some(self.to_string())
    }

    pub fn matches(&self, expected: &str) -> bool {
        match self {
            Cell::Text(s) => s.trim() == expected,
            Cell::Number(_) => self.to_string() == expected,
            Cell::Missing => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => write!(f, "{}", s.trim()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Missing, Cell::from)
    }
}

/// A percentage column derived from two other columns of the same table.
///
/// Keeping the pair around lets a rollup recompute the percentage from
/// summed counts instead of averaging percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioColumn {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    ratios: Vec<RatioColumn>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            ratios: Vec::new(),
        }
    }

    /// Append a row, padding short rows with `Missing` and dropping
    /// trailing cells beyond the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ratios(&self) -> &[RatioColumn] {
        &self.ratios
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Numeric value of a cell, with missing or unparseable values read as 0.
    pub fn number(&self, row: usize, column: &str) -> f64 {
        self.cell(row, column)
            .and_then(Cell::as_f64)
            .unwrap_or(0.0)
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Index of the first row whose cells equal `key` on `key_columns`.
    pub fn find_row(&self, key_columns: &[&str], key: &[&str]) -> Option<usize> {
        let idxs: Option<Vec<usize>> = key_columns.iter().map(|c| self.column_index(c)).collect();
        let idxs = idxs?;
        self.rows.iter().position(|row| {
            idxs.iter()
                .zip(key)
                .all(|(i, k)| row[*i].key().as_deref() == Some(*k))
        })
    }

    /// Replace `name` if it exists, append it otherwise. `values` must have
    /// one entry per row.
    pub fn with_column(mut self, name: &str, values: Vec<Cell>) -> Self {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        self
    }

    /// Apply `f` to every cell of `name`. Absent columns leave the table as is.
    pub fn map_column<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Cell) -> Cell,
    {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
        self
    }

    /// Constant-valued column, replacing any existing column of that name.
    pub fn with_constant(self, name: &str, value: Cell) -> Self {
        let values = vec![value; self.rows.len()];
        self.with_column(name, values)
    }

    pub fn with_ratio(mut self, ratio: RatioColumn) -> Self {
        self.ratios.retain(|r| r.name != ratio.name);
        self.ratios.push(ratio);
        self
    }

    pub fn filter<F>(&self, predicate: F) -> Table
    where
        F: Fn(&Table, usize) -> bool,
    {
        let rows = (0..self.rows.len())
            .filter(|i| predicate(self, *i))
            .map(|i| self.rows[i].clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
            ratios: self.ratios.clone(),
        }
    }

    /// Rename columns, keeping ratio metadata pointing at the new names.
    pub fn rename(mut self, renames: &[(&str, &str)]) -> Self {
        let lookup = |name: &str| -> Option<String> {
            renames
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, to)| to.to_string())
        };
        for col in &mut self.columns {
            if let Some(to) = lookup(col.as_str()) {
                *col = to;
            }
        }
        for ratio in &mut self.ratios {
            for field in [&mut ratio.name, &mut ratio.numerator, &mut ratio.denominator] {
                if let Some(to) = lookup(field.as_str()) {
                    *field = to;
                }
            }
        }
        self
    }

    /// Reorder columns: `preferred` first (those that exist), then the rest
    /// in their current order.
    pub fn reorder(mut self, preferred: &[&str]) -> Self {
        let mut order: Vec<usize> = preferred
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        for idx in 0..self.columns.len() {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }
        self.columns = order.iter().map(|i| self.columns[*i].clone()).collect();
        self.rows = self
            .rows
            .into_iter()
            .map(|row| order.iter().map(|i| row[*i].clone()).collect())
            .collect();
        self
    }

    /// Drop a column and any ratio that depends on it.
    pub fn drop_column(mut self, name: &str) -> Self {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
            self.ratios
                .retain(|r| r.name != name && r.numerator != name && r.denominator != name);
        }
        self
    }

    /// Stable sort by the given columns. Numeric cells compare numerically,
    /// everything else by display text.
    pub fn sort_by(mut self, columns: &[&str], descending: bool) -> Self {
        let idxs: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        self.rows.sort_by(|a, b| {
            let ord = idxs
                .iter()
                .map(|i| compare_cells(&a[*i], &b[*i]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        self
    }
}

fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Cell::Missing, Cell::Missing) => Ordering::Equal,
        (Cell::Missing, _) => Ordering::Greater,
        (_, Cell::Missing) => Ordering::Less,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_not_present() {
        assert!(!Cell::text("   ").is_present());
        assert!(!Cell::Missing.is_present());
        assert!(Cell::text("2024-01-01 10:00").is_present());
        assert_eq!(Cell::text("").key(), None);
    }

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(Cell::Number(3.0).to_string(), "3");
        assert_eq!(Cell::Number(12.5).to_string(), "12.5");
    }

    #[test]
    fn rename_keeps_ratio_metadata_in_sync() {
        let table = Table::new(["CANCELADO", "Total", "% CANCELADO"]).with_ratio(RatioColumn {
            name: "% CANCELADO".into(),
            numerator: "CANCELADO".into(),
            denominator: "Total".into(),
        });
        let renamed = table.rename(&[("Total", "total_trip")]);

        assert_eq!(renamed.ratios()[0].denominator, "total_trip");
    }

    #[test]
    fn reorder_puts_preferred_columns_first() {
        let mut table = Table::new(["c", "a", "b"]);
        table.push_row(vec![Cell::from("3"), Cell::from("1"), Cell::from("2")]);
        let table = table.reorder(&["a", "missing", "b"]);

        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.rows()[0][2], Cell::from("3"));
    }

    #[test]
    fn sort_by_descending_compares_numbers_numerically() {
        let mut table = Table::new(["station", "pct"]);
        table.push_row(vec![Cell::from("A"), Cell::Number(9.5)]);
        table.push_row(vec![Cell::from("B"), Cell::Number(10.0)]);
        let sorted = table.sort_by(&["pct"], true);

        assert_eq!(sorted.cell(0, "station"), Some(&Cell::from("B")));
    }
}
