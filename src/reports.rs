// Page-level tables of the trips dashboard, built from the aggregation
// primitives: general summary, station/regional detail, offenders and
// ETA/CPT adherence.
use crate::columns::{resolve_column, ColumnAlias};
use crate::indicator::{merge_indicator, IndicatorSpec};
use crate::pivot::{build_pivot, pct_column, Measure, Pivot};
use crate::prepare::prepare;
use crate::rollup::rollup;
use crate::table::{Cell, RatioColumn, Table};
use crate::types::*;
use crate::util::percent;
use std::collections::BTreeSet;
use tracing::{debug, info};

pub const OPERATION_LABEL: &str = "Operação";
pub const STATION_LABEL: &str = "Estação";
pub const REGIONAL_LABEL: &str = "Regional";
pub const TOTAL_TRIP: &str = "total_trip";

/// Preferred column order of the detail tables; anything else follows.
const DETAIL_ORDER: &[&str] = &[
    TOTAL,
    "CREATED",
    "ASSIGNING",
    "ASSIGNED",
    "CANCELADO",
    "% CANCELADO",
    "%Cancel Nok",
    "ARRIVED",
    "LOADING",
    "DEPARTED",
    "SEAL",
    "FECHADA",
    "% FECHADA",
    "% ETA",
    "CPT Trips",
    "CPT Delay",
    "% CPT",
];

/// Negative indicators of the offenders page: status, output column, label.
pub const OFFENDER_INDICATORS: &[(&str, &str, &str)] = &[
    (CANCELLED, "%_cancelado", "Cancelado"),
    (NO_SHOW, "%_no_show", "No Show"),
    (FRUITLESS, "%_infrutifera", "Infrutífera"),
    (NOT_CONSUMED, "%_nao_consumida", "Não Consumida"),
    (CLOSED, "%_fechada", "Fechada"),
];

/// Operation/station selection; `None` means "Todas".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub operation: Option<String>,
    pub station: Option<String>,
}

impl RowFilter {
    pub fn apply(&self, table: &Table) -> Table {
        table.filter(|t, row| {
            let op_ok = self.operation.as_deref().map_or(true, |op| {
                t.cell(row, OPERATION).is_some_and(|c| c.matches(op))
            });
            let st_ok = self.station.as_deref().map_or(true, |st| {
                t.cell(row, ORIGIN_STATION).is_some_and(|c| c.matches(st))
            });
            op_ok && st_ok
        })
    }
}

fn distinct(table: &Table, column: &str) -> Vec<String> {
    let values: BTreeSet<String> = table
        .column_values(column)
        .unwrap_or_default()
        .into_iter()
        .filter_map(Cell::key)
        .collect();
    values.into_iter().collect()
}

pub fn available_operations(table: &Table) -> Vec<String> {
    distinct(table, OPERATION)
}

pub fn available_stations(table: &Table) -> Vec<String> {
    distinct(table, ORIGIN_STATION)
}

// ---------------------------------------------------------------------------
// Resumo Geral

/// Trip status counts per operation.
pub fn operation_summary(table: &Table) -> Pivot {
    build_pivot(table, &[OPERATION], STATUS, &Measure::trips())
}

/// Headline numbers for one operation, or `None` if it has no trips.
pub fn operation_metrics(summary: &Pivot, operation: &str) -> Option<OperationMetrics> {
    let t = &summary.table;
    let row = t.find_row(&[OPERATION], &[operation])?;
    Some(OperationMetrics {
        operation: operation.to_string(),
        total_trips: t.number(row, TOTAL) as u64,
        pct_closed: t.number(row, &pct_column(CLOSED)),
        pct_cancelled: t.number(row, &pct_column(CANCELLED)),
    })
}

pub fn status_breakdown(summary: &Pivot, operation: &str) -> Vec<StatusRow> {
    let t = &summary.table;
    let Some(row) = t.find_row(&[OPERATION], &[operation]) else {
        return Vec::new();
    };
    summary
        .categories
        .iter()
        .map(|status| StatusRow {
            status: status.clone(),
            quantity: t.number(row, status) as u64,
            percentage: t.number(row, &pct_column(status)),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Station,
    Regional,
}

impl GroupBy {
    pub fn column(self) -> &'static str {
        match self {
            GroupBy::Station => ORIGIN_STATION,
            GroupBy::Regional => REGIONAL,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupBy::Station => STATION_LABEL,
            GroupBy::Regional => REGIONAL_LABEL,
        }
    }
}

/// Blank and `#N/A` regionals go to the "Sem Regional" bucket so those
/// trips still show up in the regional table.
fn bucket_regionals(table: &Table) -> Table {
    let mut table = table.clone();
    if let Some(actual) = ColumnAlias::Regional.resolve(&table) {
        if actual != REGIONAL {
            table = table.rename(&[(actual.as_str(), REGIONAL)]);
        }
    } else {
        return table;
    }
    table.map_column(REGIONAL, |cell| {
        let bucket = match cell {
            Cell::Missing => true,
            Cell::Text(s) => s.trim().is_empty() || s.trim() == "#N/A",
            Cell::Number(_) => false,
        };
        if bucket {
            Cell::text(NO_REGIONAL)
        } else {
            cell.clone()
        }
    })
}

/// Status pivot per (operation, group) with cancel adherence, CPT delay and
/// ETA delay merged in, columns renamed for display and ordered.
pub fn detail_by_group(table: &Table, group: GroupBy) -> Table {
    let table = match group {
        GroupBy::Regional => bucket_regionals(table),
        GroupBy::Station => table.clone(),
    };
    let group_col = group.column();
    if !table.has_column(group_col) {
        debug!(column = group_col, "group column absent, detail table is empty");
        return Table::new([OPERATION_LABEL, group.label()]);
    }

    let keys = [OPERATION, group_col];
    let base = build_pivot(&table, &keys, STATUS, &Measure::trips()).table;
    let detail = [
        IndicatorSpec::cancel_adherence(&table),
        IndicatorSpec::cpt_delay(),
        IndicatorSpec::eta_delay(),
    ]
    .iter()
    .fold(base, |acc, spec| merge_indicator(&acc, &table, &keys, spec));

    let detail = detail
        .rename(&[(OPERATION, OPERATION_LABEL), (group_col, group.label())])
        .sort_by(&[OPERATION_LABEL, group.label()], false);
    order_columns(detail, &[OPERATION_LABEL, group.label()])
}

fn order_columns(table: Table, leading: &[&str]) -> Table {
    let mut preferred: Vec<String> = leading.iter().map(|s| s.to_string()).collect();
    for name in DETAIL_ORDER {
        if let Some(actual) = resolve_column(&table, &[*name]) {
            if !preferred.contains(&actual) {
                preferred.push(actual);
            }
        }
    }
    let preferred: Vec<&str> = preferred.iter().map(String::as_str).collect();
    table.reorder(&preferred)
}

/// The detail table of one operation, without the operation column.
pub fn detail_for_operation(detail: &Table, operation: &str) -> Table {
    detail
        .filter(|t, row| t.cell(row, OPERATION_LABEL).is_some_and(|c| c.matches(operation)))
        .drop_column(OPERATION_LABEL)
}

/// One row per group across all operations, with every percentage
/// recomputed from the summed counts.
pub fn cross_operation(detail: &Table, group: GroupBy) -> Table {
    rollup(detail, group.label())
}

// ---------------------------------------------------------------------------
// Ofensores

/// Per-station rates of the negative statuses. A status the snapshot never
/// had is reported as 0.0.
pub fn offenders(table: &Table) -> Table {
    let pivot = build_pivot(table, &[ORIGIN_STATION, OPERATION], STATUS, &Measure::trips());
    let mut out = pivot.table.rename(&[(TOTAL, TOTAL_TRIP)]);
    for (status, column, _) in OFFENDER_INDICATORS {
        if !pivot.categories.iter().any(|c| c == status) {
            out = out.with_constant(status, Cell::Number(0.0));
        }
        let values: Vec<Cell> = (0..out.len())
            .map(|row| Cell::Number(percent(out.number(row, status), out.number(row, TOTAL_TRIP))))
            .collect();
        out = out.with_column(column, values).with_ratio(RatioColumn {
            name: column.to_string(),
            numerator: status.to_string(),
            denominator: TOTAL_TRIP.to_string(),
        });
    }
    out
}

/// Rows of one operation sorted by `indicator`.
pub fn rank(table: &Table, operation: &str, indicator: &str, descending: bool) -> Table {
    let station = if table.has_column(ORIGIN_STATION) {
        ORIGIN_STATION
    } else {
        STATION_LABEL
    };
    let operation_col = if table.has_column(OPERATION) {
        OPERATION
    } else {
        OPERATION_LABEL
    };
    let subset = table.filter(|t, row| t.cell(row, operation_col).is_some_and(|c| c.matches(operation)));
    let mut selected = Table::new([station, TOTAL_TRIP, indicator]);
    for row in 0..subset.len() {
        selected.push_row(vec![
            subset.cell(row, station).cloned().unwrap_or(Cell::Missing),
            Cell::Number(subset.number(row, TOTAL_TRIP)),
            Cell::Number(subset.number(row, indicator)),
        ]);
    }
    selected.sort_by(&[indicator], descending)
}

/// Worst stations first.
pub fn rank_offenders(offenders: &Table, operation: &str, indicator: &str) -> Table {
    rank(offenders, operation, indicator, true)
}

// ---------------------------------------------------------------------------
// Aderência

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdherenceKind {
    Eta,
    Cpt,
}

impl AdherenceKind {
    pub fn realized_column(self) -> &'static str {
        match self {
            AdherenceKind::Eta => ETA_REALIZED,
            AdherenceKind::Cpt => CPT_REALIZED,
        }
    }

    pub fn status_column(self) -> &'static str {
        match self {
            AdherenceKind::Eta => STATUS_ETA,
            AdherenceKind::Cpt => STATUS_CPT,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            AdherenceKind::Eta => "%_eta_on_time",
            AdherenceKind::Cpt => "%_cpt_on_time",
        }
    }
}

/// Share of ON TIME trips per station, among trips with a realized time.
pub fn adherence(table: &Table, kind: AdherenceKind) -> Table {
    let realized = kind.realized_column();
    let with_time = table.filter(|t, row| t.cell(row, realized).is_some_and(Cell::is_present));
    let pivot = build_pivot(
        &with_time,
        &[ORIGIN_STATION, OPERATION],
        kind.status_column(),
        &Measure::trips(),
    );
    let mut out = pivot.table.rename(&[(TOTAL, TOTAL_TRIP)]);
    if !pivot.categories.iter().any(|c| c == ON_TIME) {
        out = out.with_constant(ON_TIME, Cell::Number(0.0));
    }
    let values: Vec<Cell> = (0..out.len())
        .map(|row| Cell::Number(percent(out.number(row, ON_TIME), out.number(row, TOTAL_TRIP))))
        .collect();
    out.with_column(kind.indicator(), values)
        .with_ratio(RatioColumn {
            name: kind.indicator().to_string(),
            numerator: ON_TIME.to_string(),
            denominator: TOTAL_TRIP.to_string(),
        })
}

/// Worst stations first, i.e. lowest adherence.
pub fn rank_adherence(adherence: &Table, operation: &str, kind: AdherenceKind) -> Table {
    rank(adherence, operation, kind.indicator(), false)
}

/// Operation-wide adherence, weighted by trips rather than averaged over
/// stations. 0.0 when the operation has no realized trips.
pub fn operation_adherence(adherence: &Table, operation: &str, kind: AdherenceKind) -> f64 {
    let rolled = rollup(adherence, OPERATION);
    rolled
        .find_row(&[OPERATION], &[operation])
        .map_or(0.0, |row| rolled.number(row, kind.indicator()))
}

// ---------------------------------------------------------------------------

/// Every table of one render cycle, computed from a single raw snapshot.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub prepared_rows: usize,
    pub filtered_rows: usize,
    pub summary: Pivot,
    pub metrics: Vec<OperationMetrics>,
    pub station_detail: Table,
    pub regional_detail: Table,
    pub regional_rollup: Table,
    pub offenders: Table,
    pub eta_adherence: Table,
    pub cpt_adherence: Table,
}

/// load -> prepare -> filter -> aggregate, for one snapshot.
///
/// Offenders and adherence ignore the filter, as their pages do.
pub fn build_dashboard(raw: &Table, filter: &RowFilter) -> Dashboard {
    let prepared = prepare(raw);
    let filtered = filter.apply(&prepared);

    let summary = operation_summary(&filtered);
    let metrics = available_operations(&filtered)
        .iter()
        .filter_map(|op| operation_metrics(&summary, op))
        .collect();
    let station_detail = detail_by_group(&filtered, GroupBy::Station);
    let regional_detail = detail_by_group(&filtered, GroupBy::Regional);
    let regional_rollup = cross_operation(&regional_detail, GroupBy::Regional);

    info!(
        rows = prepared.len(),
        filtered = filtered.len(),
        stations = station_detail.len(),
        "built dashboard tables"
    );

    Dashboard {
        prepared_rows: prepared.len(),
        filtered_rows: filtered.len(),
        summary,
        metrics,
        station_detail,
        regional_detail,
        regional_rollup,
        offenders: offenders(&prepared),
        eta_adherence: adherence(&prepared, AdherenceKind::Eta),
        cpt_adherence: adherence(&prepared, AdherenceKind::Cpt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Table {
        let mut table = Table::new([
            TRIP_NUMBER,
            ORIGIN_STATION,
            REGIONAL,
            STATUS,
            ETA_REALIZED,
            STATUS_ETA,
        ]);
        let rows: [[&str; 6]; 6] = [
            ["T1", "SOC-01", "SP", "FECHADA", "08:00", "ON TIME"],
            ["T2", "SOC-01", "#N/A", "CANCELADO", "", ""],
            ["T3", "SOC-02", "", "NO SHOW", "", ""],
            ["T4", "SOC-02", "SP", "FECHADA", "09:00", "DELAY"],
            ["T5", "FMH-01", "RJ", "FECHADA", "10:00", "ON TIME"],
            ["T6", "FMH-01", "RJ", "FECHADA", "11:00", "ON TIME"],
        ];
        for row in rows {
            table.push_row(row.into_iter().map(Cell::from).collect());
        }
        table
    }

    #[test]
    fn filter_selects_operation_and_station() {
        let table = prepare(&raw());
        let filter = RowFilter {
            operation: Some("SOC".into()),
            station: Some("SOC-02".into()),
        };

        assert_eq!(filter.apply(&table).len(), 2);
        assert_eq!(RowFilter::default().apply(&table).len(), 6);
        assert_eq!(available_operations(&table), vec!["FMH", "SOC"]);
        assert_eq!(available_stations(&table).len(), 3);
    }

    #[test]
    fn metrics_default_absent_statuses_to_zero() {
        let table = prepare(&raw());
        let summary = operation_summary(&table);

        let fmh = operation_metrics(&summary, "FMH").expect("FMH has trips");
        assert_eq!(fmh.total_trips, 2);
        assert_eq!(fmh.pct_closed, 100.0);
        assert_eq!(fmh.pct_cancelled, 0.0);
        assert!(operation_metrics(&summary, "XPT").is_none());

        let soc = status_breakdown(&summary, "SOC");
        let closed = soc.iter().find(|r| r.status == CLOSED).expect("closed row");
        assert_eq!(closed.quantity, 2);
        assert_eq!(closed.percentage, 50.0);
    }

    #[test]
    fn regional_detail_buckets_blank_regionals() {
        let table = prepare(&raw());
        let detail = detail_by_group(&table, GroupBy::Regional);

        let bucket = detail
            .find_row(&[OPERATION_LABEL, REGIONAL_LABEL], &["SOC", NO_REGIONAL])
            .expect("bucket row");
        assert_eq!(detail.number(bucket, TOTAL), 2.0);
        assert_eq!(detail.columns()[0], OPERATION_LABEL);
        assert_eq!(detail.columns()[1], REGIONAL_LABEL);
        assert_eq!(detail.columns()[2], TOTAL);
    }

    #[test]
    fn regional_detail_accepts_aliased_header() {
        let mut table = Table::new([TRIP_NUMBER, ORIGIN_STATION, "Region", STATUS]);
        for row in [
            ["T1", "SOC-01", "SP", "FECHADA"],
            ["T2", "SOC-01", "SP", "CANCELADO"],
            ["T3", "SOC-02", "#N/A", "FECHADA"],
        ] {
            table.push_row(row.into_iter().map(Cell::from).collect());
        }
        let detail = detail_by_group(&prepare(&table), GroupBy::Regional);

        assert_eq!(detail.len(), 2);
        assert!(!detail.has_column("Region"));
        let sp = detail
            .find_row(&[OPERATION_LABEL, REGIONAL_LABEL], &["SOC", "SP"])
            .expect("SP row");
        assert_eq!(detail.number(sp, TOTAL), 2.0);
        assert_eq!(detail.number(sp, "% CANCELADO"), 50.0);
        let bucket = detail
            .find_row(&[OPERATION_LABEL, REGIONAL_LABEL], &["SOC", NO_REGIONAL])
            .expect("bucket row");
        assert_eq!(detail.number(bucket, TOTAL), 1.0);
    }

    #[test]
    fn station_detail_carries_all_indicators() {
        let table = prepare(&raw());
        let detail = detail_by_group(&table, GroupBy::Station);

        for col in ["%Cancel Nok", "% CPT", "% ETA", "CPT Trips", "CPT Delay"] {
            assert!(detail.has_column(col), "missing {col}");
        }
        let soc02 = detail
            .find_row(&[OPERATION_LABEL, STATION_LABEL], &["SOC", "SOC-02"])
            .expect("row");
        assert_eq!(detail.number(soc02, "% ETA"), 100.0);

        let soc_only = detail_for_operation(&detail, "SOC");
        assert_eq!(soc_only.len(), 2);
        assert!(!soc_only.has_column(OPERATION_LABEL));
    }

    #[test]
    fn missing_group_column_yields_empty_detail() {
        let mut table = Table::new([TRIP_NUMBER, ORIGIN_STATION, STATUS]);
        table.push_row(vec![Cell::from("T1"), Cell::from("SOC-01"), Cell::from("FECHADA")]);
        let detail = detail_by_group(&prepare(&table), GroupBy::Regional);

        assert!(detail.is_empty());
        assert_eq!(detail.columns(), &[OPERATION_LABEL, REGIONAL_LABEL]);
    }

    #[test]
    fn offenders_fill_unobserved_statuses_with_zero() {
        let table = prepare(&raw());
        let offenders = offenders(&table);

        let soc02 = offenders
            .find_row(&[ORIGIN_STATION, OPERATION], &["SOC-02", "SOC"])
            .expect("row");
        assert_eq!(offenders.number(soc02, "%_no_show"), 50.0);
        assert_eq!(offenders.cell(soc02, "%_infrutifera"), Some(&Cell::Number(0.0)));

        let ranked = rank_offenders(&offenders, "SOC", "%_cancelado");
        assert_eq!(ranked.cell(0, ORIGIN_STATION), Some(&Cell::from("SOC-01")));
        assert_eq!(ranked.number(0, "%_cancelado"), 50.0);
    }

    #[test]
    fn adherence_is_weighted_per_operation() {
        let table = prepare(&raw());
        let eta = adherence(&table, AdherenceKind::Eta);

        let soc02 = eta.find_row(&[ORIGIN_STATION, OPERATION], &["SOC-02", "SOC"]).expect("row");
        assert_eq!(eta.number(soc02, "%_eta_on_time"), 0.0);
        assert_eq!(operation_adherence(&eta, "SOC", AdherenceKind::Eta), 50.0);
        assert_eq!(operation_adherence(&eta, "FMH", AdherenceKind::Eta), 100.0);

        let ranked = rank_adherence(&eta, "SOC", AdherenceKind::Eta);
        assert_eq!(ranked.cell(0, ORIGIN_STATION), Some(&Cell::from("SOC-02")));
    }

    #[test]
    fn adherence_without_realized_times_is_empty() {
        let table = prepare(&raw());
        let cpt = adherence(&table, AdherenceKind::Cpt);

        assert!(cpt.is_empty());
        assert_eq!(operation_adherence(&cpt, "SOC", AdherenceKind::Cpt), 0.0);
    }
}
