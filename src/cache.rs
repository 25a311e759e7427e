use crate::error::SourceError;
use crate::loader::{DataSource, LoadReport};
use crate::table::Table;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// One successfully loaded raw snapshot.
#[derive(Debug)]
pub struct Snapshot {
    pub table: Table,
    pub report: LoadReport,
    pub fetched_at: DateTime<Utc>,
}

/// Result of asking the cache for data.
#[derive(Debug)]
pub enum CacheOutcome {
    /// Last snapshot is still within the TTL; the source was not called.
    Cached(Arc<Snapshot>),
    /// The source was called and returned a new snapshot.
    Refreshed(Arc<Snapshot>),
    /// The source failed; the last good snapshot is served instead.
    Stale {
        snapshot: Arc<Snapshot>,
        error: SourceError,
    },
    /// The source failed and nothing has ever loaded. Callers must report
    /// "no data this cycle" instead of rendering zeros.
    Unavailable(SourceError),
}

impl CacheOutcome {
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            CacheOutcome::Cached(s) | CacheOutcome::Refreshed(s) => Some(s),
            CacheOutcome::Stale { snapshot, .. } => Some(snapshot),
            CacheOutcome::Unavailable(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SourceError> {
        match self {
            CacheOutcome::Stale { error, .. } | CacheOutcome::Unavailable(error) => Some(error),
            CacheOutcome::Cached(_) | CacheOutcome::Refreshed(_) => None,
        }
    }
}

/// Time-bounded memoization of `DataSource::load_raw`.
///
/// Keeps the last good snapshot and when it was fetched. A failed load does
/// not touch either, so the next call retries.
#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    last_fetch: Option<DateTime<Utc>>,
    last_good: Option<Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            last_fetch: None,
            last_good: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.last_fetch.is_some_and(|at| now - at < self.ttl)
    }

    /// Forget the fetch time so the next `get` reloads. The last good
    /// snapshot is kept as a fallback.
    pub fn invalidate(&mut self) {
        self.last_fetch = None;
    }

    pub fn get(&mut self, source: &dyn DataSource, now: DateTime<Utc>) -> CacheOutcome {
        if self.is_fresh(now) {
            if let Some(snapshot) = &self.last_good {
                debug!(fetched_at = %snapshot.fetched_at, "serving cached snapshot");
                return CacheOutcome::Cached(Arc::clone(snapshot));
            }
        }

        match source.load_raw() {
            Ok((table, report)) => {
                let snapshot = Arc::new(Snapshot {
                    table,
                    report,
                    fetched_at: now,
                });
                self.last_fetch = Some(now);
                self.last_good = Some(Arc::clone(&snapshot));
                CacheOutcome::Refreshed(snapshot)
            }
            Err(error) => match &self.last_good {
                Some(snapshot) => {
                    warn!(%error, fetched_at = %snapshot.fetched_at, "refresh failed, serving last good snapshot");
                    CacheOutcome::Stale {
                        snapshot: Arc::clone(snapshot),
                        error,
                    }
                }
                None => {
                    warn!(%error, "refresh failed and no snapshot is available");
                    CacheOutcome::Unavailable(error)
                }
            },
        }
    }
}
