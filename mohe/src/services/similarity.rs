use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SimilarityConfig;
use crate::db::{DatabaseBackend, MbtiWeights};
use crate::error::{MoheError, Result};
use crate::models::{
    round4, CoOccurrence, PairwiseSimilarity, SimilarityReport, SimilarityStatistics,
};

const STATISTICS_SAMPLE_SIZE: usize = 100;

/// Decay factor for evidence whose latest co-bookmark is `age_days` old.
///
/// Evidence inside the window is not discounted.
pub fn pair_decay(age_days: f64, window_days: f64, tau_days: f64) -> f64 {
    let days_since_cutoff = (age_days - window_days).max(0.0);
    if tau_days <= 0.0 {
        return if days_since_cutoff > 0.0 { 0.0 } else { 1.0 };
    }
    (-days_since_cutoff / tau_days).exp()
}

/// Score one pair from its co-occurrence and the bookmarking user count of each place.
pub fn pair_similarity(
    co: &CoOccurrence,
    users_low: i64,
    users_high: i64,
    config: &SimilarityConfig,
    now: DateTime<Utc>,
) -> Result<PairwiseSimilarity> {
    let union = users_low + users_high - co.co_users;
    if users_low <= 0 || users_high <= 0 || union <= 0 || co.co_users <= 0 {
        return Err(MoheError::InvariantViolation(format!(
            "Inconsistent bookmark counts for pair ({}, {}): users {users_low}/{users_high}, common {}",
            co.place_id_low, co.place_id_high, co.co_users
        )));
    }

    let age_days = ((now - co.last_co_bookmark_at).num_seconds() as f64 / 86_400.0).max(0.0);
    let decay = pair_decay(
        age_days,
        config.pair_decay_window_days,
        config.pair_decay_tau_days,
    );

    let jaccard = (co.co_users as f64 / union as f64 * decay).clamp(0.0, 1.0);
    let cosine = (co.weighted_co_users * decay / ((users_low * users_high) as f64).sqrt())
        .clamp(0.0, 1.0);

    PairwiseSimilarity::new(
        co.place_id_low,
        co.place_id_high,
        round4(jaccard),
        round4(cosine),
        co.co_users,
        now,
    )
}

/// Computes and maintains pairwise place similarity from bookmark co-occurrence.
#[derive(Clone)]
pub struct SimilarityService {
    db: Arc<dyn DatabaseBackend>,
    config: SimilarityConfig,
}

impl SimilarityService {
    pub fn new(db: Arc<dyn DatabaseBackend>, config: SimilarityConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    fn weights(&self) -> MbtiWeights {
        MbtiWeights {
            same: self.config.same_mbti_weight,
            different: self.config.diff_mbti_weight,
        }
    }

    /// Recompute every co-occurring pair, batch by batch.
    ///
    /// After a completed pass, rows the pass did not refresh are removed. A
    /// cancelled pass keeps everything it has written and removes nothing.
    pub async fn calculate_all(&self, cancel: &CancellationToken) -> Result<SimilarityReport> {
        let started_at = Utc::now();
        let batch_size = self.config.batch_size.max(1);
        let mut report = SimilarityReport::default();
        let mut after = (i64::MIN, i64::MIN);

        info!(batch_size, "Starting full similarity calculation");

        loop {
            if cancel.is_cancelled() {
                info!(
                    pairs_written = report.pairs_written,
                    "Similarity calculation cancelled"
                );
                report.cancelled = true;
                return Ok(report);
            }

            let page = self
                .db
                .co_occurrence_page(self.weights(), after, batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after = (last.place_id_low, last.place_id_high);

            let (batch, skipped) = self.score_page(&page, started_at).await?;
            report.pairs_skipped += skipped;
            report.pairs_written += self.db.write_similarity_batch(&batch).await?;
            debug!(
                written = report.pairs_written,
                skipped = report.pairs_skipped,
                "Similarity batch committed"
            );

            if page.len() < batch_size {
                break;
            }
        }

        report.pairs_removed = self.db.delete_similarities_updated_before(started_at).await?;

        info!(
            pairs_written = report.pairs_written,
            pairs_skipped = report.pairs_skipped,
            pairs_removed = report.pairs_removed,
            "Full similarity calculation complete"
        );
        Ok(report)
    }

    /// Recompute one pair. Returns `None`, after deleting any stale row, when
    /// the places share no bookmarking user.
    pub async fn calculate_pair(&self, a: i64, b: i64) -> Result<Option<PairwiseSimilarity>> {
        if a == b {
            return Err(MoheError::Validation(format!(
                "Cannot calculate similarity of place {a} with itself"
            )));
        }

        let Some(co) = self.db.co_occurrence_for_pair(self.weights(), a, b).await? else {
            if self.db.delete_similarity(a, b).await? {
                debug!(a, b, "Removed similarity without co-occurrence");
            }
            return Ok(None);
        };

        let counts = self
            .db
            .bookmark_user_counts(&[co.place_id_low, co.place_id_high])
            .await?;
        let similarity = pair_similarity(
            &co,
            counts.get(&co.place_id_low).copied().unwrap_or(0),
            counts.get(&co.place_id_high).copied().unwrap_or(0),
            &self.config,
            Utc::now(),
        )
        .map_err(|e| {
            warn!(a, b, error = %e, "Skipping invalid pair similarity");
            e
        })?;

        self.db.upsert_similarity(&similarity).await?;
        Ok(Some(similarity))
    }

    /// Recompute every pair touching `place_id` and drop pairs that lost their evidence.
    ///
    /// Returns the neighbors whose pair rows changed.
    pub async fn recalculate_place(&self, place_id: i64) -> Result<Vec<i64>> {
        let now = Utc::now();
        let page = self
            .db
            .co_occurrences_for_place(self.weights(), place_id)
            .await?;
        let (batch, skipped) = self.score_page(&page, now).await?;
        self.db.write_similarity_batch(&batch).await?;

        let mut touched: HashSet<i64> = batch
            .iter()
            .filter_map(|pair| pair.neighbor_of(place_id))
            .collect();
        let live: HashSet<i64> = page
            .iter()
            .map(|co| if co.place_id_low == place_id { co.place_id_high } else { co.place_id_low })
            .collect();

        for stale in self.db.similarities_for_place(place_id).await? {
            let Some(neighbor) = stale.neighbor_of(place_id) else {
                continue;
            };
            if !live.contains(&neighbor) && self.db.delete_similarity(place_id, neighbor).await? {
                touched.insert(neighbor);
            }
        }

        debug!(place_id, pairs = batch.len(), skipped, "Recalculated place similarities");
        let mut touched: Vec<i64> = touched.into_iter().collect();
        touched.sort_unstable();
        Ok(touched)
    }

    async fn score_page(
        &self,
        page: &[CoOccurrence],
        now: DateTime<Utc>,
    ) -> Result<(Vec<PairwiseSimilarity>, u64)> {
        let mut ids: Vec<i64> = page
            .iter()
            .flat_map(|co| [co.place_id_low, co.place_id_high])
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let counts: HashMap<i64, i64> = self.db.bookmark_user_counts(&ids).await?;

        let mut skipped = 0;
        let batch = page
            .iter()
            .filter_map(|co| {
                let users_low = counts.get(&co.place_id_low).copied().unwrap_or(0);
                let users_high = counts.get(&co.place_id_high).copied().unwrap_or(0);
                match pair_similarity(co, users_low, users_high, &self.config, now) {
                    Ok(pair) => Some(pair),
                    Err(e) => {
                        warn!(
                            place_id_low = co.place_id_low,
                            place_id_high = co.place_id_high,
                            error = %e,
                            "Skipping invalid pair similarity"
                        );
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        Ok((batch, skipped))
    }

    /// Totals and averages over the most recently updated pairs.
    pub async fn statistics(&self) -> Result<SimilarityStatistics> {
        let total_pairs = self.db.count_similarities().await?;
        let total_top_k_entries = self.db.count_top_k().await?;
        let sample = self
            .db
            .sample_recent_similarities(STATISTICS_SAMPLE_SIZE)
            .await?;

        let sample_size = sample.len();
        let (average_jaccard, average_cosine) = if sample.is_empty() {
            (0.0, 0.0)
        } else {
            let n = sample_size as f64;
            (
                round4(sample.iter().map(|s| s.jaccard).sum::<f64>() / n),
                round4(sample.iter().map(|s| s.cosine).sum::<f64>() / n),
            )
        };

        Ok(SimilarityStatistics {
            total_pairs,
            total_top_k_entries,
            average_jaccard,
            average_cosine,
            sample_size,
        })
    }
}
