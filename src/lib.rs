//! Trip status reporting over a spreadsheet snapshot.
//!
//! Raw rows are loaded through a [`loader::DataSource`] (memoized by
//! [`cache::SnapshotCache`]), normalized by [`prepare::prepare`] and turned
//! into grouped percentage tables by [`pivot::build_pivot`],
//! [`indicator::merge_indicator`] and [`rollup::rollup`]. The
//! [`reports`] module assembles the dashboard pages from those pieces.
pub mod cache;
pub mod columns;
pub mod config;
pub mod error;
pub mod indicator;
pub mod loader;
pub mod output;
pub mod pivot;
pub mod prepare;
pub mod reports;
pub mod rollup;
pub mod table;
pub mod telemetry;
pub mod types;
pub mod util;

pub use columns::resolve_column;
pub use indicator::{merge_indicator, IndicatorSpec};
pub use pivot::{build_pivot, Measure, Pivot};
pub use prepare::prepare;
pub use rollup::rollup;
pub use table::{Cell, Table};
