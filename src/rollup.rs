use crate::table::{Cell, Table};
use crate::util::percent;
use std::collections::BTreeMap;

/// Collapse a per-(operation, group) table into one row per `group_col`.
///
/// Numeric columns are summed; every registered ratio column is then
/// recomputed from its summed numerator and denominator. Percentages are
/// never averaged. Text columns other than `group_col` (the operation key,
/// for instance) do not survive the rollup.
pub fn rollup(detail: &Table, group_col: &str) -> Table {
    let Some(group_idx) = detail.column_index(group_col) else {
        return Table::new([group_col]);
    };

    let ratio_names: Vec<&str> = detail.ratios().iter().map(|r| r.name.as_str()).collect();
    let summed: Vec<(usize, &String)> = detail
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            *idx != group_idx && !ratio_names.contains(&name.as_str()) && is_numeric(detail, *idx)
        })
        .collect();
    let ratios: Vec<_> = detail
        .ratios()
        .iter()
        .filter(|r| {
            summed.iter().any(|(_, c)| **c == r.numerator)
                && summed.iter().any(|(_, c)| **c == r.denominator)
        })
        .cloned()
        .collect();

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in detail.rows() {
        let Some(key) = row[group_idx].key() else {
            continue;
        };
        let acc = groups
            .entry(key)
            .or_insert_with(|| vec![0.0; summed.len()]);
        for (slot, (idx, _)) in acc.iter_mut().zip(&summed) {
            *slot += row[*idx].as_f64().unwrap_or(0.0);
        }
    }

    // keep the detail table's column order for whatever survives
    let mut columns: Vec<&str> = vec![group_col];
    for name in detail.columns() {
        let kept = summed.iter().any(|(_, c)| *c == name) || ratios.iter().any(|r| r.name == *name);
        if kept {
            columns.push(name);
        }
    }

    let mut out = Table::new(columns.iter().copied());
    for (key, sums) in groups {
        let value_of = |name: &str| -> f64 {
            summed
                .iter()
                .position(|(_, c)| c.as_str() == name)
                .map_or(0.0, |i| sums[i])
        };
        let row: Vec<Cell> = columns
            .iter()
            .map(|name| {
                if *name == group_col {
                    return Cell::text(key.clone());
                }
                match ratios.iter().find(|r| r.name == *name) {
                    Some(r) => Cell::Number(percent(value_of(&r.numerator), value_of(&r.denominator))),
                    None => Cell::Number(value_of(*name)),
                }
            })
            .collect();
        out.push_row(row);
    }
    ratios.into_iter().fold(out, Table::with_ratio)
}

fn is_numeric(table: &Table, idx: usize) -> bool {
    let mut any_number = false;
    for row in table.rows() {
        match &row[idx] {
            Cell::Number(_) => any_number = true,
            Cell::Missing => {}
            text @ Cell::Text(_) => {
                if !text.is_present() {
                    continue;
                }
                if text.as_f64().is_none() {
                    return false;
                }
                any_number = true;
            }
        }
    }
    any_number
}
