// Entry point and high-level CLI flow.
//
// - Option [1] refreshes the snapshot (bypassing the cache) and prints
//   diagnostics.
// - Option [2] builds every dashboard table, exports them and prints
//   previews. It reuses the cached snapshot while it is fresh.
// - Option [3] sets the operation/station filters.
// With `--once` the reports are generated a single time and the program exits.
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use trip_report::cache::{CacheOutcome, SnapshotCache};
use trip_report::config::{AppConfig, DEFAULT_CACHE_TTL_SECS};
use trip_report::loader::CsvSource;
use trip_report::reports::{self, AdherenceKind, Dashboard, RowFilter};
use trip_report::types::ReportSummary;
use trip_report::{output, telemetry, util};

#[derive(Parser)]
#[command(name = "trip_report")]
#[command(about = "Trip status, cancellation and adherence reports", long_about = None)]
struct Cli {
    /// CSV snapshot of the trips sheet (overrides TRIP_REPORT_DATA)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Directory for exported reports (overrides TRIP_REPORT_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Generate the reports once and exit
    #[arg(long)]
    once: bool,
}

// In-memory app state: the snapshot cache and the current filters survive
// across menu actions within one run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    cache: Option<SnapshotCache>,
    filter: RowFilter,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after generating reports.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Ask the cache for a snapshot and say what happened.
fn fetch(source: &CsvSource) -> CacheOutcome {
    let mut state = state();
    let cache = state
        .cache
        .get_or_insert_with(|| SnapshotCache::new(chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECS)));
    cache.get(source, Utc::now())
}

/// Handle option [1]: reload the snapshot regardless of the cache.
fn handle_load(source: &CsvSource) {
    if let Some(cache) = state().cache.as_mut() {
        cache.invalidate();
    }
    match fetch(source) {
        CacheOutcome::Refreshed(snapshot) | CacheOutcome::Cached(snapshot) => {
            println!(
                "Processing dataset... ({} rows loaded, {} columns)",
                util::format_int(snapshot.report.total_rows as u64),
                util::format_int(snapshot.report.columns as u64)
            );
            if snapshot.report.short_rows > 0 {
                println!(
                    "Note: {} rows had fewer fields than the header.",
                    util::format_int(snapshot.report.short_rows as u64)
                );
            }
            println!();
        }
        CacheOutcome::Stale { snapshot, error } => {
            eprintln!("Failed to refresh {}: {}", source.path().display(), error);
            println!(
                "Still showing the snapshot loaded at {}.\n",
                snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        CacheOutcome::Unavailable(error) => {
            eprintln!("Failed to load {}: {}", source.path().display(), error);
            println!("No data available this cycle.\n");
        }
    }
}

/// Handle option [3]: choose operation and station ("Todas" when blank).
fn handle_filters(source: &CsvSource) {
    let outcome = fetch(source);
    if let Some(snapshot) = outcome.snapshot() {
        let prepared = trip_report::prepare(&snapshot.table);
        println!("Operações: {}", reports::available_operations(&prepared).join(", "));
        println!("Estações: {}", reports::available_stations(&prepared).join(", "));
    }
    let operation = read_line("Operação (blank = Todas): ");
    let station = read_line("Estação (blank = Todas): ");
    let filter = RowFilter {
        operation: (!operation.is_empty()).then_some(operation),
        station: (!station.is_empty()).then_some(station),
    };
    info!(?filter, "filters updated");
    state().filter = filter;
    println!();
}

fn export(path: &Path, title: &str, table: &trip_report::Table, preview_rows: usize) {
    if let Err(e) = output::write_csv(path, table) {
        eprintln!("Write error: {}", e);
    }
    output::preview_table(title, table, preview_rows);
    println!("(Full table exported to {})\n", path.display());
}

fn print_dashboard(dashboard: &Dashboard, output_dir: &Path) {
    println!("Resumo Geral\n");
    for metrics in &dashboard.metrics {
        println!(
            "{}: {} trips | Fechadas {} | Canceladas {}",
            metrics.operation,
            util::format_int(metrics.total_trips),
            util::format_percent(metrics.pct_closed),
            util::format_percent(metrics.pct_cancelled)
        );
        let breakdown = reports::status_breakdown(&dashboard.summary, &metrics.operation);
        output::preview_table_rows(&breakdown, breakdown.len());
    }

    export(
        &output_dir.join("report1_station_detail.csv"),
        "Detalhamento por Estação",
        &dashboard.station_detail,
        5,
    );
    for metrics in &dashboard.metrics {
        let detail = reports::detail_for_operation(&dashboard.station_detail, &metrics.operation);
        output::preview_table(&format!("{} por Estação", metrics.operation), &detail, 5);
    }
    export(
        &output_dir.join("report2_regional_detail.csv"),
        "Detalhamento por Regional",
        &dashboard.regional_detail,
        5,
    );
    export(
        &output_dir.join("report3_regional_rollup.csv"),
        "Regional (todas as operações)",
        &dashboard.regional_rollup,
        5,
    );
    export(
        &output_dir.join("report4_offenders.csv"),
        "Ofensores",
        &dashboard.offenders,
        5,
    );

    for metrics in &dashboard.metrics {
        for (_, column, label) in reports::OFFENDER_INDICATORS.iter().take(4) {
            let ranked = reports::rank_offenders(&dashboard.offenders, &metrics.operation, column);
            output::preview_table(&format!("{} - {}", metrics.operation, label), &ranked, 3);
        }
    }

    for (kind, table, file) in [
        (AdherenceKind::Eta, &dashboard.eta_adherence, "report5_eta_adherence.csv"),
        (AdherenceKind::Cpt, &dashboard.cpt_adherence, "report6_cpt_adherence.csv"),
    ] {
        export(&output_dir.join(file), kind.indicator(), table, 5);
        for metrics in &dashboard.metrics {
            println!(
                "{} - {}: {}\n",
                metrics.operation,
                kind.indicator(),
                util::format_percent(reports::operation_adherence(table, &metrics.operation, kind))
            );
            let ranked = reports::rank_adherence(table, &metrics.operation, kind);
            output::preview_table("Piores estações", &ranked, 3);
        }
    }
}

/// Handle option [2]: build every table, export, preview.
fn handle_generate_reports(source: &CsvSource, output_dir: &Path) {
    let outcome = fetch(source);
    let stale = matches!(outcome, CacheOutcome::Stale { .. });
    let Some(snapshot) = outcome.snapshot() else {
        println!("Error: No data available this cycle. Check the data source and retry (option 1).\n");
        return;
    };
    if stale {
        println!(
            "Warning: refresh failed; reports use the snapshot from {}.\n",
            snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let filter = state().filter.clone();
    println!("Generating reports...\n");
    let dashboard = reports::build_dashboard(&snapshot.table, &filter);
    print_dashboard(&dashboard, output_dir);

    let summary = ReportSummary {
        snapshot_fetched_at: snapshot.fetched_at,
        stale,
        total_rows: dashboard.prepared_rows,
        filtered_rows: dashboard.filtered_rows,
        operations: dashboard.metrics.clone(),
    };
    if let Err(e) = output::write_json(&output_dir.join("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_rows\": {}, \"filtered_rows\": {}}}\n",
        util::format_int(summary.total_rows as u64),
        util::format_int(summary.filtered_rows as u64)
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load().context("invalid configuration")?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    telemetry::init(&config.log_level).context("unable to initialize logging")?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("unable to create {}", config.output_dir.display()))?;

    let cache = SnapshotCache::new(config.cache_ttl);
    info!(
        data = %config.data_path.display(),
        ttl_secs = cache.ttl().num_seconds(),
        "starting trip_report"
    );
    state().cache = Some(cache);
    let source = CsvSource::new(&config.data_path);

    if cli.once {
        handle_generate_reports(&source, &config.output_dir);
        return Ok(());
    }

    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Set Filters\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(&source),
            "2" => {
                println!();
                handle_generate_reports(&source, &config.output_dir);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_filters(&source),
            other => {
                debug!(choice = other, "invalid menu choice");
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
    Ok(())
}
