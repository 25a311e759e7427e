use serde::Serialize;
use tabled::Tabled;

// Source column names, as exported by the trips spreadsheet.
pub const TRIP_NUMBER: &str = "trip_number";
pub const ORIGIN_STATION: &str = "origin_station_code";
pub const OPERATION: &str = "operacao_origem";
pub const REGIONAL: &str = "regional";
pub const STATUS: &str = "status_agrupado";
pub const TOTAL_ORDERS: &str = "total_orders";
pub const CPT_REALIZED: &str = "cpt_origin_realized";
pub const ETA_REALIZED: &str = "eta_origin_realized";
pub const STATUS_CPT: &str = "status_cpt";
pub const STATUS_ETA: &str = "status_eta";

// Trip statuses the reports single out.
pub const CANCELLED: &str = "CANCELADO";
pub const CLOSED: &str = "FECHADA";
pub const NO_SHOW: &str = "NO SHOW";
pub const FRUITLESS: &str = "INFRUTÍFERA";
pub const NOT_CONSUMED: &str = "NÃO CONSUMIDA";
pub const DELAY: &str = "DELAY";
pub const ON_TIME: &str = "ON TIME";

/// Bucket for trips whose regional is blank or a sheet error.
pub const NO_REGIONAL: &str = "Sem Regional";

pub const TOTAL: &str = "Total";

/// Headline numbers for one operation on the general summary page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationMetrics {
    pub operation: String,
    pub total_trips: u64,
    pub pct_closed: f64,
    pub pct_cancelled: f64,
}

/// One line of the per-operation status breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StatusRow {
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub quantity: u64,
    #[serde(rename = "Percentual")]
    #[tabled(rename = "Percentual")]
    #[tabled(display_with = "crate::util::display_percent")]
    pub percentage: f64,
}

/// Written to `summary.json` after each report run.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub snapshot_fetched_at: chrono::DateTime<chrono::Utc>,
    pub stale: bool,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub operations: Vec<OperationMetrics>,
}
