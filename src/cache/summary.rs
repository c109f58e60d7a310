//! Time-to-live cache for the district summary set
//!
//! Provides a `SummaryCache` that keeps the last computed summary set together
//! with the instant it was computed. Reads within the TTL reuse the stored set;
//! the first read after expiry refetches and recomputes it wholesale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::data::{aggregate, DistrictSummary, ParseFailures, RecordSource, SourceError};

/// Default time-to-live for the summary set (10 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Last successful computation
#[derive(Debug)]
struct CacheEntry {
    /// Monotonic time of computation, used for the TTL check
    computed_at: Instant,
    /// Wall-clock time of computation, for reporting
    cached_at: DateTime<Utc>,
    summary: Arc<Vec<DistrictSummary>>,
    parse_failures: ParseFailures,
}

/// Snapshot of the cache state, served by `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cached: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
    pub districts: usize,
    pub refreshes: u64,
    pub parse_failures: ParseFailures,
}

/// In-memory cache of the district summary set
///
/// The published entry sits behind its own lock, which is only held long
/// enough to read or swap an `Arc`. Refreshes are serialized by a separate
/// mutex held across the fetch, so callers that miss while a refresh is in
/// flight wait for it and then read its result instead of starting their own
/// fetch. Readers of a fresh entry and `stats()` never wait on a refresh.
pub struct SummaryCache {
    source: Arc<dyn RecordSource>,
    ttl: Duration,
    published: RwLock<Option<Arc<CacheEntry>>>,
    refresh: Mutex<()>,
    refreshes: AtomicU64,
}

impl SummaryCache {
    /// Creates an empty cache over `source` with the given TTL
    pub fn new(source: Arc<dyn RecordSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            published: RwLock::new(None),
            refresh: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The published summary set, if it is younger than the TTL
    async fn fresh(&self) -> Option<Arc<Vec<DistrictSummary>>> {
        let entry = self.published.read().await.clone()?;
        (entry.computed_at.elapsed() < self.ttl).then(|| Arc::clone(&entry.summary))
    }

    /// Returns the district summary set, recomputing it when stale or empty
    ///
    /// # Returns
    /// * `Ok(summary)` - the cached set if younger than the TTL, otherwise a
    ///   freshly computed one
    /// * `Err(SourceError)` - if a refresh was needed and the fetch failed;
    ///   the previous entry, if any, is kept
    pub async fn get_summary(&self) -> Result<Arc<Vec<DistrictSummary>>, SourceError> {
        if let Some(summary) = self.fresh().await {
            tracing::debug!(districts = summary.len(), "Summary cache hit");
            return Ok(summary);
        }

        let _refresh = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(summary) = self.fresh().await {
            tracing::debug!(districts = summary.len(), "Summary refreshed by another caller");
            return Ok(summary);
        }

        let records = self.source.fetch_records().await?;
        let aggregation = aggregate(&records);
        let summary = Arc::new(aggregation.summaries);

        let entry = CacheEntry {
            computed_at: Instant::now(),
            cached_at: Utc::now(),
            summary: Arc::clone(&summary),
            parse_failures: aggregation.parse_failures,
        };
        *self.published.write().await = Some(Arc::new(entry));
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            records = records.len(),
            districts = summary.len(),
            "Summary cache refreshed"
        );
        Ok(summary)
    }

    /// Reports the current cache state without triggering or awaiting a refresh
    pub async fn stats(&self) -> CacheStats {
        let entry = self.published.read().await.clone();
        let refreshes = self.refreshes.load(Ordering::Relaxed);
        let ttl_secs = self.ttl.as_secs();

        match entry {
            Some(entry) => CacheStats {
                cached: true,
                cached_at: Some(entry.cached_at),
                age_secs: Some(entry.computed_at.elapsed().as_secs()),
                ttl_secs,
                districts: entry.summary.len(),
                refreshes,
                parse_failures: entry.parse_failures,
            },
            None => CacheStats {
                cached: false,
                cached_at: None,
                age_secs: None,
                ttl_secs,
                districts: 0,
                refreshes,
                parse_failures: ParseFailures::default(),
            },
        }
    }
}
