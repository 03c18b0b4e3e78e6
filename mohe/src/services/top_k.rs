use std::cmp::Ordering;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::SimilarityConfig;
use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::{CombinedWeights, PairwiseSimilarity, TopKEntry, TopKRefreshReport};

/// Rank the pairs involving `place_id` into a dense 1..=n neighbor list of at most `k` rows.
///
/// Ordered by combined score desc, then co-users desc, then neighbor id asc.
/// Pairs with no signal at all are not eligible.
pub fn rank_neighbors(
    place_id: i64,
    pairs: &[PairwiseSimilarity],
    weights: CombinedWeights,
    k: usize,
) -> Vec<TopKEntry> {
    let mut eligible: Vec<(i64, &PairwiseSimilarity, f64)> = pairs
        .iter()
        .filter(|pair| pair.jaccard > 0.0 || pair.cosine > 0.0)
        .filter_map(|pair| {
            pair.neighbor_of(place_id)
                .map(|neighbor| (neighbor, pair, weights.combine(pair.jaccard, pair.cosine)))
        })
        .collect();

    eligible.sort_by(|(a_id, a, a_score), (b_id, b, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(Ordering::Equal)
            .then(b.co_users.cmp(&a.co_users))
            .then(a_id.cmp(b_id))
    });

    eligible
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(index, (neighbor, pair, _))| TopKEntry {
            place_id,
            neighbor_place_id: neighbor,
            rank: index as i64 + 1,
            jaccard: pair.jaccard,
            cosine: pair.cosine,
            co_users: pair.co_users,
            updated_at: pair.updated_at,
        })
        .collect()
}

/// Maintains the per-place neighbor lists.
#[derive(Clone)]
pub struct TopKService {
    db: Arc<dyn DatabaseBackend>,
    config: SimilarityConfig,
}

impl TopKService {
    pub fn new(db: Arc<dyn DatabaseBackend>, config: SimilarityConfig) -> Self {
        Self { db, config }
    }

    pub fn weights(&self) -> CombinedWeights {
        CombinedWeights {
            jaccard: self.config.jaccard_weight,
            cosine: self.config.cosine_weight,
        }
    }

    /// Fully replace the neighbor list of one place. Returns the rows written.
    pub async fn refresh(&self, place_id: i64) -> Result<u64> {
        let pairs = self.db.similarities_for_place(place_id).await?;
        let entries = rank_neighbors(place_id, &pairs, self.weights(), self.config.top_k);
        let written = self.db.replace_top_k(place_id, &entries).await?;
        debug!(place_id, written, "Refreshed top-k neighbors");
        Ok(written)
    }

    /// Refresh many places on a bounded pool. Failures are counted, not propagated.
    pub async fn refresh_many(&self, place_ids: &[i64]) -> TopKRefreshReport {
        let concurrency = self.config.refresh_concurrency.max(1);
        let results: Vec<(i64, Result<u64>)> = stream::iter(place_ids.iter().copied())
            .map(|place_id| async move { (place_id, self.refresh(place_id).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = TopKRefreshReport::default();
        for (place_id, result) in results {
            match result {
                Ok(written) => {
                    report.refreshed += 1;
                    report.entries_written += written;
                }
                Err(e) => {
                    warn!(place_id, error = %e, "Failed to refresh top-k neighbors");
                    report.failed += 1;
                }
            }
        }

        info!(
            refreshed = report.refreshed,
            failed = report.failed,
            entries_written = report.entries_written,
            "Top-k batch refresh complete"
        );
        report
    }

    /// Refresh every place that has similarity rows or a stored neighbor list.
    ///
    /// Places whose last pair was removed are included so their lists are emptied.
    pub async fn refresh_all(&self) -> Result<TopKRefreshReport> {
        let mut place_ids = self.db.places_with_similarities().await?;
        place_ids.extend(self.db.places_with_top_k().await?);
        place_ids.sort_unstable();
        place_ids.dedup();
        Ok(self.refresh_many(&place_ids).await)
    }

    pub async fn neighbors(&self, place_id: i64, limit: usize) -> Result<Vec<TopKEntry>> {
        self.db.get_top_k(place_id, limit).await
    }
}
