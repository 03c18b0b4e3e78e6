use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::{SimilarityReport, TopKRefreshReport};
use crate::services::{SimilarityService, TopKService, VectorService};

/// Guards the full recalculation so at most one pass runs at a time.
#[derive(Debug, Default)]
pub struct RecalculationFlag {
    running: AtomicBool,
}

impl RecalculationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move from idle to running. Returns false when a pass already holds the flag.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `try_start` with a guard that calls `finish` when dropped.
    pub fn acquire(self: &Arc<Self>) -> Option<FlagGuard> {
        self.try_start().then(|| FlagGuard {
            flag: Arc::clone(self),
        })
    }
}

pub struct FlagGuard {
    flag: Arc<RecalculationFlag>,
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.flag.finish();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecalculationOutcome {
    Completed(SimilarityReport),
    AlreadyRunning,
}

/// Places whose bookmark sets changed since the last incremental sweep.
#[derive(Debug, Default)]
pub struct DirtyPlaces {
    places: Mutex<HashSet<i64>>,
}

impl DirtyPlaces {
    pub fn mark_dirty(&self, place_ids: impl IntoIterator<Item = i64>) {
        let mut places = self.places.lock().unwrap_or_else(|p| p.into_inner());
        places.extend(place_ids);
    }

    /// Take every dirty place, sorted.
    pub fn drain(&self) -> Vec<i64> {
        let mut places = self.places.lock().unwrap_or_else(|p| p.into_inner());
        let mut drained: Vec<i64> = places.drain().collect();
        drained.sort_unstable();
        drained
    }

    pub fn len(&self) -> usize {
        self.places.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps the similarity tables consistent: full passes behind the running
/// flag, incremental Top-K refreshes for dirty places outside it.
#[derive(Clone)]
pub struct SimilarityScheduler {
    db: Arc<dyn DatabaseBackend>,
    similarity: SimilarityService,
    top_k: TopKService,
    flag: Arc<RecalculationFlag>,
    dirty: Arc<DirtyPlaces>,
    last_sweep: Arc<Mutex<DateTime<Utc>>>,
    cancel: CancellationToken,
}

impl SimilarityScheduler {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        similarity: SimilarityService,
        top_k: TopKService,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            db,
            similarity,
            top_k,
            flag: Arc::new(RecalculationFlag::new()),
            dirty: Arc::new(DirtyPlaces::default()),
            last_sweep: Arc::new(Mutex::new(Utc::now())),
            cancel,
        }
    }

    pub fn flag(&self) -> &Arc<RecalculationFlag> {
        &self.flag
    }

    pub fn is_calculation_running(&self) -> bool {
        self.flag.is_running()
    }

    pub fn mark_dirty(&self, place_ids: impl IntoIterator<Item = i64>) {
        self.dirty.mark_dirty(place_ids);
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Run a full pass now, or report that one is already running.
    pub async fn run_full_recalculation(&self) -> Result<RecalculationOutcome> {
        let Some(guard) = self.flag.acquire() else {
            info!("Full similarity recalculation already running");
            return Ok(RecalculationOutcome::AlreadyRunning);
        };
        self.full_pass(guard).await.map(RecalculationOutcome::Completed)
    }

    /// Start a full pass in the background. Returns false when one is already running.
    pub fn trigger_full_recalculation(&self) -> bool {
        let Some(guard) = self.flag.acquire() else {
            info!("Manual recalculation ignored, a pass is already running");
            return false;
        };

        let scheduler = self.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.full_pass(guard).await {
                error!(error = %e, "Manual similarity recalculation failed");
            }
        });
        true
    }

    async fn full_pass(&self, _guard: FlagGuard) -> Result<SimilarityReport> {
        info!("Starting full similarity recalculation");
        let mut report = self.similarity.calculate_all(&self.cancel).await?;
        if report.cancelled {
            info!("Full recalculation cancelled before top-k refresh");
            return Ok(report);
        }

        let refreshed = self.top_k.refresh_all().await?;
        report.places_refreshed = refreshed.refreshed;
        info!(
            pairs_written = report.pairs_written,
            pairs_skipped = report.pairs_skipped,
            pairs_removed = report.pairs_removed,
            places_refreshed = report.places_refreshed,
            "Full similarity recalculation complete"
        );
        Ok(report)
    }

    /// Recalculate and refresh every dirty place, plus places that gained or
    /// lost a bookmark since the previous sweep. Not gated by the running flag.
    pub async fn run_top_k_refresh_once(&self) -> Result<TopKRefreshReport> {
        let sweep_started = Utc::now();
        let since = *self.last_sweep.lock().unwrap_or_else(|p| p.into_inner());
        let recent = self.db.places_changed_since(since).await?;
        self.dirty.mark_dirty(recent);
        *self.last_sweep.lock().unwrap_or_else(|p| p.into_inner()) = sweep_started;

        let dirty = self.dirty.drain();
        if dirty.is_empty() {
            debug!("No dirty places to refresh");
            return Ok(TopKRefreshReport::default());
        }

        let mut to_refresh: HashSet<i64> = HashSet::new();
        for place_id in &dirty {
            match self.similarity.recalculate_place(*place_id).await {
                Ok(neighbors) => {
                    to_refresh.insert(*place_id);
                    to_refresh.extend(neighbors);
                }
                Err(e) => {
                    warn!(place_id, error = %e, "Failed to recalculate dirty place, retrying next sweep");
                    self.dirty.mark_dirty([*place_id]);
                }
            }
        }

        let mut to_refresh: Vec<i64> = to_refresh.into_iter().collect();
        to_refresh.sort_unstable();
        info!(dirty = dirty.len(), refreshing = to_refresh.len(), "Refreshing dirty places");
        Ok(self.top_k.refresh_many(&to_refresh).await)
    }
}

/// Periodic full recalculation.
#[derive(Clone)]
pub struct FullRecalculationManager {
    scheduler: SimilarityScheduler,
    interval_secs: u64,
}

impl FullRecalculationManager {
    pub fn new(scheduler: SimilarityScheduler, interval_secs: u64) -> Self {
        Self {
            scheduler,
            interval_secs,
        }
    }

    /// Returns the pairs written, or 0 when another pass held the flag.
    pub async fn run_once(&self) -> Result<u64> {
        match self.scheduler.run_full_recalculation().await? {
            RecalculationOutcome::Completed(report) => Ok(report.pairs_written),
            RecalculationOutcome::AlreadyRunning => Ok(0),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

/// Periodic incremental refresh of dirty places.
#[derive(Clone)]
pub struct TopKRefreshManager {
    scheduler: SimilarityScheduler,
    interval_secs: u64,
}

impl TopKRefreshManager {
    pub fn new(scheduler: SimilarityScheduler, interval_secs: u64) -> Self {
        Self {
            scheduler,
            interval_secs,
        }
    }

    pub async fn run_once(&self) -> Result<u64> {
        let report = self.scheduler.run_top_k_refresh_once().await?;
        Ok(report.refreshed)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

/// Recomputes cached user/place vector similarities.
#[derive(Clone)]
pub struct VectorSimilarityBatchManager {
    vectors: VectorService,
    batch_size: usize,
    interval_secs: u64,
    cancel: CancellationToken,
}

impl VectorSimilarityBatchManager {
    pub fn new(
        vectors: VectorService,
        batch_size: usize,
        interval_secs: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            vectors,
            batch_size,
            interval_secs,
            cancel,
        }
    }

    pub async fn run_once(&self) -> Result<u64> {
        self.vectors
            .batch_calculate_similarities(self.batch_size, &self.cancel)
            .await
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

/// Deletes vector similarities past their retention window.
#[derive(Clone)]
pub struct SimilarityCleanupManager {
    vectors: VectorService,
    older_than_days: i64,
    interval_secs: u64,
}

impl SimilarityCleanupManager {
    pub fn new(vectors: VectorService, older_than_days: i64, interval_secs: u64) -> Self {
        Self {
            vectors,
            older_than_days,
            interval_secs,
        }
    }

    pub async fn run_once(&self) -> Result<u64> {
        self.vectors.cleanup_old_similarities(self.older_than_days).await
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}
