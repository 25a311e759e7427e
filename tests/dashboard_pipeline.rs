use trip_report::cache::{CacheOutcome, SnapshotCache};
use trip_report::indicator::{merge_indicator, IndicatorSpec};
use trip_report::loader::{read_table, CsvSource};
use trip_report::reports::{
    build_dashboard, cross_operation, detail_by_group, GroupBy, RowFilter, OPERATION_LABEL,
    REGIONAL_LABEL, STATION_LABEL,
};
use trip_report::types::{OPERATION, ORIGIN_STATION, STATUS, TOTAL};
use trip_report::{build_pivot, prepare, resolve_column, Cell, Measure, Table};

const SNAPSHOT: &str = "\
trip_number,origin_station_code,regional,status_agrupado,total_orders,cpt_origin_realized,status_cpt,eta_origin_realized,status_eta,Aderência Cancelamento,Contagem Cancelamentos
T01,SOC-01,SP,FECHADA,120,2024-05-01 10:00,ON TIME,2024-05-01 08:00,ON TIME,0,0
T02,SOC-01,SP,CANCELADO,n/a,,,,,1,1
T03,SOC-01,SP,FECHADA,95,2024-05-01 11:00,DELAY,2024-05-01 09:00,DELAY,0,0
T04,SOC-02,#N/A,NO SHOW,,,,,,0,0
T05,SOC-02,,FECHADA,80,2024-05-01 12:00,ON TIME,,,0,0
T06,FMH-01,SP,FECHADA,10,2024-05-01 13:00,DELAY,2024-05-01 12:00,ON TIME,0,0
T07,FMH-01,SP,CANCELADO,,,,,,0,1
T08,FMH-01,SP,FECHADA,12,2024-05-01 14:00,ON TIME,2024-05-01 13:00,ON TIME,0,0
T09,FMH-02,RJ,INFRUTÍFERA,,,,,,0,0
";

fn snapshot() -> Table {
    read_table(SNAPSHOT.as_bytes()).expect("valid snapshot").0
}

#[test]
fn station_pivot_matches_worked_example() {
    let mut raw = Table::new(["trip_number", "origin_station_code", "status_agrupado"]);
    for (trip, station, status) in [
        ("T1", "SOC-01", "CANCELADO"),
        ("T2", "SOC-01", "FECHADA"),
        ("T3", "SOC-02", "FECHADA"),
    ] {
        raw.push_row(vec![Cell::from(trip), Cell::from(station), Cell::from(status)]);
    }
    let pivot = build_pivot(&prepare(&raw), &[OPERATION, ORIGIN_STATION], STATUS, &Measure::trips());
    let t = &pivot.table;

    let soc01 = t.find_row(&[OPERATION, ORIGIN_STATION], &["SOC", "SOC-01"]).expect("row");
    assert_eq!(t.number(soc01, "CANCELADO"), 1.0);
    assert_eq!(t.number(soc01, "FECHADA"), 1.0);
    assert_eq!(t.number(soc01, TOTAL), 2.0);
    assert_eq!(t.number(soc01, "% CANCELADO"), 50.0);
    assert_eq!(t.number(soc01, "% FECHADA"), 50.0);

    let soc02 = t.find_row(&[OPERATION, ORIGIN_STATION], &["SOC", "SOC-02"]).expect("row");
    assert_eq!(t.number(soc02, "FECHADA"), 1.0);
    assert_eq!(t.number(soc02, TOTAL), 1.0);
    assert_eq!(t.number(soc02, "% FECHADA"), 100.0);
}

#[test]
fn resolver_finds_accented_header_in_snapshot() {
    let table = snapshot();
    assert_eq!(
        resolve_column(&table, &["aderenciacancelamento"]),
        Some("Aderência Cancelamento".to_string())
    );
}

#[test]
fn prepare_twice_is_prepare_once() {
    let once = prepare(&snapshot());
    assert_eq!(prepare(&once), once);
    assert_eq!(once.cell(1, "total_orders"), Some(&Cell::Missing));
    assert_eq!(once.cell(0, "total_orders"), Some(&Cell::Number(120.0)));
}

#[test]
fn station_detail_reports_cancel_adherence_and_delays() {
    let table = prepare(&snapshot());
    let detail = detail_by_group(&table, GroupBy::Station);
    let keys = [OPERATION_LABEL, STATION_LABEL];

    let soc01 = detail.find_row(&keys, &["SOC", "SOC-01"]).expect("row");
    assert_eq!(detail.number(soc01, TOTAL), 3.0);
    assert_eq!(detail.number(soc01, "%Cancel Nok"), 100.0);
    assert_eq!(detail.number(soc01, "CPT Trips"), 2.0);
    assert_eq!(detail.number(soc01, "% CPT"), 50.0);
    assert_eq!(detail.number(soc01, "% ETA"), 50.0);

    // FMH-01 had one cancellation counted and none flagged
    let fmh01 = detail.find_row(&keys, &["FMH", "FMH-01"]).expect("row");
    assert_eq!(detail.number(fmh01, "%Cancel Nok"), 0.0);

    // FMH-02 has no realized times at all but keeps its row
    let fmh02 = detail.find_row(&keys, &["FMH", "FMH-02"]).expect("row kept");
    assert_eq!(detail.cell(fmh02, "% CPT"), Some(&Cell::Number(0.0)));
    assert_eq!(detail.cell(fmh02, "% ETA"), Some(&Cell::Number(0.0)));
}

#[test]
fn regional_rollup_equals_direct_regional_aggregation() {
    let table = prepare(&snapshot());
    let detail = detail_by_group(&table, GroupBy::Regional);
    let rolled = cross_operation(&detail, GroupBy::Regional);

    let sp = rolled.find_row(&[REGIONAL_LABEL], &["SP"]).expect("SP row");
    // SOC/SP closes 2 of 3, FMH/SP 2 of 3; CPT delay 2 of 4 overall
    assert_eq!(rolled.number(sp, TOTAL), 6.0);
    assert_eq!(rolled.number(sp, "% FECHADA"), 66.67);
    assert_eq!(rolled.number(sp, "% CPT"), 50.0);
    assert_eq!(rolled.number(sp, "%Cancel Nok"), 50.0);

    let bucket = rolled
        .find_row(&[REGIONAL_LABEL], &["Sem Regional"])
        .expect("blank regionals bucketed");
    assert_eq!(rolled.number(bucket, TOTAL), 2.0);
    assert_eq!(rolled.number(bucket, "% CPT"), 0.0);

    // aggregate the unsplit data by regional directly and compare
    let direct_keys = ["regional"];
    let bucketed = table.map_column("regional", |c| {
        if c.is_present() && !c.matches("#N/A") {
            c.clone()
        } else {
            Cell::from("Sem Regional")
        }
    });
    let base = build_pivot(&bucketed, &direct_keys, STATUS, &Measure::trips()).table;
    let direct = [
        IndicatorSpec::cancel_adherence(&bucketed),
        IndicatorSpec::cpt_delay(),
        IndicatorSpec::eta_delay(),
    ]
    .iter()
    .fold(base, |acc, spec| merge_indicator(&acc, &bucketed, &direct_keys, spec));

    assert_eq!(rolled.len(), direct.len());
    for row in 0..direct.len() {
        for col in direct.columns().iter().filter(|c| c.as_str() != "regional") {
            assert_eq!(rolled.cell(row, col), direct.cell(row, col), "column {col}");
        }
    }
}

#[test]
fn dashboard_respects_operation_filter() {
    let filter = RowFilter {
        operation: Some("FMH".to_string()),
        station: None,
    };
    let dashboard = build_dashboard(&snapshot(), &filter);

    assert_eq!(dashboard.prepared_rows, 9);
    assert_eq!(dashboard.filtered_rows, 4);
    assert_eq!(dashboard.metrics.len(), 1);
    assert_eq!(dashboard.metrics[0].operation, "FMH");
    assert_eq!(dashboard.metrics[0].pct_closed, 50.0);
    assert!(dashboard
        .station_detail
        .column_values(OPERATION_LABEL)
        .expect("operation column")
        .iter()
        .all(|c| c.matches("FMH")));
    // offenders ignore the filter
    assert_eq!(dashboard.offenders.len(), 4);
}

#[test]
fn unreadable_source_is_reported_as_unavailable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = CsvSource::new(dir.path().join("missing.csv"));
    let mut cache = SnapshotCache::new(chrono::Duration::seconds(300));

    let outcome = cache.get(&source, chrono::Utc::now());
    assert!(matches!(outcome, CacheOutcome::Unavailable(_)));
}
