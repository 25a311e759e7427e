use crate::error::SourceError;
use crate::table::{Cell, Table};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Diagnostics about one load, printed by the CLI after a refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub columns: usize,
    pub short_rows: usize,
}

/// Anything that can produce a fresh raw snapshot.
///
/// Calls are treated as expensive; `SnapshotCache` decides when to make them.
pub trait DataSource {
    fn load_raw(&self) -> Result<(Table, LoadReport), SourceError>;
}

/// Snapshot exported from the spreadsheet as CSV.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for CsvSource {
    fn load_raw(&self) -> Result<(Table, LoadReport), SourceError> {
        let file = std::fs::File::open(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let (table, report) = read_table(file)?;
        info!(
            path = %self.path.display(),
            rows = report.total_rows,
            columns = report.columns,
            "loaded snapshot"
        );
        Ok((table, report))
    }
}

/// Read every record as text. Values are never coerced here; an empty
/// field stays an empty string so presence checks can tell it apart from a
/// column the export did not have.
pub fn read_table<R: Read>(reader: R) -> Result<(Table, LoadReport), SourceError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::MissingHeader);
    }

    let mut table = Table::new(headers.clone());
    let mut short_rows = 0usize;
    for result in rdr.records() {
        let record = result?;
        if record.len() < headers.len() {
            short_rows += 1;
        }
        let row: Vec<Cell> = record.iter().map(Cell::from).collect();
        table.push_row(row);
    }
    if short_rows > 0 {
        debug!(short_rows, "padded rows with fewer fields than the header");
    }

    let report = LoadReport {
        total_rows: table.len(),
        columns: headers.len(),
        short_rows,
    };
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_text_cells_and_pads_short_rows() {
        let csv = "trip_number,origin_station_code,regional\n\
T1,SOC-01,SP\n\
T2,SOC-02\n";
        let (table, report) = read_table(csv.as_bytes()).expect("valid csv");

        assert_eq!(report.total_rows, 2);
        assert_eq!(report.short_rows, 1);
        assert_eq!(table.cell(1, "regional"), Some(&Cell::Missing));
        assert_eq!(table.cell(0, "origin_station_code"), Some(&Cell::from("SOC-01")));
    }

    #[test]
    fn empty_fields_stay_empty_text() {
        let csv = "trip_number,cpt_origin_realized\nT1,\n";
        let (table, _) = read_table(csv.as_bytes()).expect("valid csv");

        assert_eq!(table.cell(0, "cpt_origin_realized"), Some(&Cell::from("")));
    }

    #[test]
    fn csv_source_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = CsvSource::new(dir.path().join("absent.csv"));

        assert!(matches!(source.load_raw(), Err(SourceError::Io { .. })));
    }

    #[test]
    fn csv_source_loads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trips.csv");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "trip_number,status_agrupado").expect("write");
        writeln!(file, "T1,FECHADA").expect("write");

        let (table, report) = CsvSource::new(&path).load_raw().expect("loads");
        assert_eq!(report.columns, 2);
        assert_eq!(table.len(), 1);
    }
}
