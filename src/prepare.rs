use crate::columns::ColumnAlias;
use crate::table::{Cell, Table};
use crate::types::{OPERATION, ORIGIN_STATION};
use tracing::debug;

/// Turn a raw snapshot into an analysis-ready table.
///
/// - the order-count column becomes numeric; unparseable values become
///   `Missing` instead of failing the load
/// - `operacao_origem` is derived from the station code prefix
///
/// No rows are dropped. Running it twice gives the same table as running it
/// once: numbers pass through the coercion untouched and the derived column
/// is recomputed, not appended.
pub fn prepare(raw: &Table) -> Table {
    let mut table = raw.clone();

    if let Some(orders) = ColumnAlias::TotalOrders.resolve(&table) {
        table = table.map_column(&orders, coerce_number);
    }

    let operations: Vec<Cell> = match table.column_values(ORIGIN_STATION) {
        Some(stations) => stations.into_iter().map(operation_of).collect(),
        None => {
            debug!("snapshot has no {} column", ORIGIN_STATION);
            vec![Cell::Missing; table.len()]
        }
    };
    table.with_column(OPERATION, operations)
}

fn coerce_number(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(_) => cell.clone(),
        other => other.as_f64().map_or(Cell::Missing, Cell::Number),
    }
}

/// `"SOC-01"` -> `"SOC"`. Codes without a dash are their own operation.
pub fn operation_of(station: &Cell) -> Cell {
    match station.key() {
        Some(code) => {
            let prefix = code.split('-').next().unwrap_or_default().trim();
            if prefix.is_empty() {
                Cell::Missing
            } else {
                Cell::text(prefix)
            }
        }
        None => Cell::Missing,
    }
}
