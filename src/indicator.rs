use crate::columns::ColumnAlias;
use crate::pivot::Measure;
use crate::table::{Cell, RatioColumn, Table};
use crate::types::{CPT_REALIZED, DELAY, ETA_REALIZED, STATUS_CPT, STATUS_ETA};
use crate::util::percent;
use std::collections::BTreeMap;
use tracing::warn;

/// Which rows of the source table an indicator looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum RowPredicate {
    All,
    /// cell is neither missing nor blank text
    Present(String),
}

impl RowPredicate {
    fn column(&self) -> Option<&str> {
        match self {
            RowPredicate::All => None,
            RowPredicate::Present(c) => Some(c),
        }
    }

    fn accepts(&self, table: &Table, row: usize) -> bool {
        match self {
            RowPredicate::All => true,
            RowPredicate::Present(c) => table.cell(row, c).is_some_and(Cell::is_present),
        }
    }
}

/// A ratio computed on its own and joined onto a pivot.
///
/// The numerator and denominator sums are written next to the percentage
/// under their own labels so later rollups can recompute it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub name: String,
    pub filter: RowPredicate,
    pub numerator: Measure,
    pub denominator: Measure,
    pub numerator_label: String,
    pub denominator_label: String,
}

impl IndicatorSpec {
    /// "%Cancel Nok": summed adherence flag over summed cancellation count.
    /// Header spellings vary, so both columns go through the alias table; if
    /// either is unresolved the merge degrades to zeros.
    pub fn cancel_adherence(table: &Table) -> Self {
        let adherence = ColumnAlias::CancelAdherence
            .resolve(table)
            .unwrap_or_else(|| ColumnAlias::CancelAdherence.candidates()[0].to_string());
        let count = ColumnAlias::CancelCount
            .resolve(table)
            .unwrap_or_else(|| ColumnAlias::CancelCount.candidates()[0].to_string());
        Self {
            name: "%Cancel Nok".to_string(),
            filter: RowPredicate::All,
            numerator: Measure::Sum(adherence),
            denominator: Measure::Sum(count),
            numerator_label: "Cancel Nok".to_string(),
            denominator_label: "Cancelamentos".to_string(),
        }
    }

    /// "% CPT": trips with a realized CPT whose CPT status is DELAY.
    pub fn cpt_delay() -> Self {
        Self::delay("CPT", CPT_REALIZED, STATUS_CPT)
    }

    /// "% ETA": trips with a realized ETA whose ETA status is DELAY.
    pub fn eta_delay() -> Self {
        Self::delay("ETA", ETA_REALIZED, STATUS_ETA)
    }

    fn delay(label: &str, realized: &str, status: &str) -> Self {
        Self {
            name: format!("% {}", label),
            filter: RowPredicate::Present(realized.to_string()),
            numerator: Measure::count_eq(status, DELAY),
            denominator: Measure::trips(),
            numerator_label: format!("{} Delay", label),
            denominator_label: format!("{} Trips", label),
        }
    }

    fn output_columns(&self) -> [&str; 3] {
        [
            self.numerator_label.as_str(),
            self.denominator_label.as_str(),
            self.name.as_str(),
        ]
    }
}

/// Aggregate `spec` over `table` per `keys` and left-join it onto `base`.
///
/// Rows failing the filter count toward neither side of the ratio. Groups of
/// `base` without any matching row get 0.0, as does a zero denominator: "no
/// realized data" is reported as 0%, not as a gap. When a source column is
/// absent the three output columns are added zero-filled.
///
/// Each call only adds columns keyed by the same `keys`, so several
/// indicators can be merged in any order.
pub fn merge_indicator(base: &Table, table: &Table, keys: &[&str], spec: &IndicatorSpec) -> Table {
    let mut required: Vec<&str> = keys.to_vec();
    required.extend(spec.filter.column());
    required.push(spec.numerator.column());
    required.push(spec.denominator.column());
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|c| !table.has_column(c))
        .collect();

    let sums = if missing.is_empty() {
        aggregate(table, keys, spec)
    } else {
        warn!(indicator = %spec.name, ?missing, "indicator source columns missing, filling with zeros");
        BTreeMap::new()
    };

    let mut numerators = Vec::with_capacity(base.len());
    let mut denominators = Vec::with_capacity(base.len());
    let mut ratios = Vec::with_capacity(base.len());
    for row in 0..base.len() {
        let key: Option<Vec<String>> = keys
            .iter()
            .map(|k| base.cell(row, k).and_then(Cell::key))
            .collect();
        let (num, den) = key
            .and_then(|k| sums.get(&k).copied())
            .unwrap_or((0.0, 0.0));
        numerators.push(Cell::Number(num));
        denominators.push(Cell::Number(den));
        ratios.push(Cell::Number(percent(num, den)));
    }

    let [num_col, den_col, name] = spec.output_columns();
    base.clone()
        .with_column(num_col, numerators)
        .with_column(den_col, denominators)
        .with_column(name, ratios)
        .with_ratio(RatioColumn {
            name: name.to_string(),
            numerator: num_col.to_string(),
            denominator: den_col.to_string(),
        })
}

fn aggregate(table: &Table, keys: &[&str], spec: &IndicatorSpec) -> BTreeMap<Vec<String>, (f64, f64)> {
    let mut sums: BTreeMap<Vec<String>, (f64, f64)> = BTreeMap::new();
    for row in 0..table.len() {
        if !spec.filter.accepts(table, row) {
            continue;
        }
        let key: Option<Vec<String>> = keys
            .iter()
            .map(|k| table.cell(row, k).and_then(Cell::key))
            .collect();
        let Some(key) = key else {
            continue;
        };
        let num = table
            .cell(row, spec.numerator.column())
            .map_or(0.0, |c| spec.numerator.value(c));
        let den = table
            .cell(row, spec.denominator.column())
            .map_or(0.0, |c| spec.denominator.value(c));
        let entry = sums.entry(key).or_insert((0.0, 0.0));
        entry.0 += num;
        entry.1 += den;
    }
    sums
}
