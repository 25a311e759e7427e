use crate::table::{Cell, RatioColumn, Table};
use crate::types::{TOTAL, TRIP_NUMBER};
use crate::util::percent;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// How each input row contributes to its group.
#[derive(Debug, Clone, PartialEq)]
pub enum Measure {
    /// rows whose cell in the column is not missing
    Count(String),
    /// rows whose cell in the column equals the value
    CountEq { column: String, value: String },
    /// sum of the column's numeric cells; missing/unparseable are skipped
    Sum(String),
}

impl Measure {
    /// Count of trips, the measure every status pivot uses.
    pub fn trips() -> Self {
        Measure::Count(TRIP_NUMBER.to_string())
    }

    pub fn count_eq(column: &str, value: &str) -> Self {
        Measure::CountEq {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Measure::Count(c) | Measure::Sum(c) => c,
            Measure::CountEq { column, .. } => column,
        }
    }

    pub(crate) fn value(&self, cell: &Cell) -> f64 {
        match self {
            Measure::Count(_) => {
                if matches!(cell, Cell::Missing) {
                    0.0
                } else {
                    1.0
                }
            }
            Measure::CountEq { value, .. } => {
                if cell.matches(value) {
                    1.0
                } else {
                    0.0
                }
            }
            Measure::Sum(_) => cell.as_f64().unwrap_or(0.0),
        }
    }
}

/// A wide table plus the category columns it was pivoted into.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub table: Table,
    pub categories: Vec<String>,
}

/// Group by `keys + [category]`, then spread the category values into one
/// column each.
///
/// Output columns: the keys, one count column per observed category (sorted),
/// `Total`, and a `% <category>` column per category. A category a group
/// never had is 0, not missing. Only key combinations present in the input
/// produce rows; rows with a blank key or category are left out. A category
/// value equal to `Total` or to a key column becomes `"<value> (<category>)"`.
pub fn build_pivot(table: &Table, keys: &[&str], category: &str, measure: &Measure) -> Pivot {
    let key_idx: Option<Vec<usize>> = keys.iter().map(|k| table.column_index(k)).collect();
    let (Some(key_idx), Some(cat_idx), Some(measure_idx)) = (
        key_idx,
        table.column_index(category),
        table.column_index(measure.column()),
    ) else {
        warn!(?keys, category, measure = measure.column(), "pivot source columns missing");
        let mut columns: Vec<&str> = keys.to_vec();
        columns.push(TOTAL);
        return Pivot {
            table: Table::new(columns),
            categories: Vec::new(),
        };
    };

    let mut groups: BTreeMap<Vec<String>, BTreeMap<String, f64>> = BTreeMap::new();
    let mut categories: BTreeSet<String> = BTreeSet::new();
    let mut renamed: BTreeSet<(String, String)> = BTreeSet::new();
    for row in table.rows() {
        let key: Option<Vec<String>> = key_idx.iter().map(|i| row[*i].key()).collect();
        let (Some(key), Some(cat)) = (key, row[cat_idx].key()) else {
            continue;
        };
        let cat = if cat == TOTAL || keys.contains(&cat.as_str()) {
            let label = format!("{} ({})", cat, category);
            renamed.insert((cat, label.clone()));
            label
        } else {
            cat
        };
        categories.insert(cat.clone());
        *groups.entry(key).or_default().entry(cat).or_insert(0.0) += measure.value(&row[measure_idx]);
    }
    for (value, label) in &renamed {
        warn!(value = %value, label = %label, "category collides with an output column, renamed");
    }
    let categories: Vec<String> = categories.into_iter().collect();

    let mut columns: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    columns.extend(categories.iter().cloned());
    columns.push(TOTAL.to_string());
    columns.extend(categories.iter().map(|c| pct_column(c)));

    let mut out = Table::new(columns);
    for (key, counts) in groups {
        let values: Vec<f64> = categories
            .iter()
            .map(|c| counts.get(c).copied().unwrap_or(0.0))
            .collect();
        let total: f64 = values.iter().sum();

        let mut row: Vec<Cell> = key.into_iter().map(Cell::Text).collect();
        row.extend(values.iter().map(|v| Cell::Number(*v)));
        row.push(Cell::Number(total));
        row.extend(values.iter().map(|v| Cell::Number(percent(*v, total))));
        out.push_row(row);
    }

    for c in &categories {
        out = out.with_ratio(RatioColumn {
            name: pct_column(c),
            numerator: c.clone(),
            denominator: TOTAL.to_string(),
        });
    }

    Pivot {
        table: out,
        categories,
    }
}

pub fn pct_column(category: &str) -> String {
    format!("% {}", category)
}
