use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{MoheError, Result};

/// Round half away from zero to 4 decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Similarity between two places, stored once per unordered pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PairwiseSimilarity {
    pub place_id_low: i64,
    pub place_id_high: i64,
    pub jaccard: f64,
    pub cosine: f64,
    pub co_users: i64,
    pub updated_at: DateTime<Utc>,
}

impl PairwiseSimilarity {
    /// Build a pair in canonical order. Scores must be finite and within [0, 1].
    pub fn new(
        a: i64,
        b: i64,
        jaccard: f64,
        cosine: f64,
        co_users: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        if a == b {
            return Err(MoheError::Validation(format!(
                "A place cannot be paired with itself: {a}"
            )));
        }
        for (name, value) in [("jaccard", jaccard), ("cosine", cosine)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(MoheError::InvariantViolation(format!(
                    "{name} similarity {value} out of range for pair ({a}, {b})"
                )));
            }
        }
        let (low, high) = canonical_pair(a, b);
        Ok(Self {
            place_id_low: low,
            place_id_high: high,
            jaccard,
            cosine,
            co_users,
            updated_at,
        })
    }

    /// The id on the other side of the pair from `place_id`.
    pub fn neighbor_of(&self, place_id: i64) -> Option<i64> {
        if place_id == self.place_id_low {
            Some(self.place_id_high)
        } else if place_id == self.place_id_high {
            Some(self.place_id_low)
        } else {
            None
        }
    }
}

pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CombinedWeights {
    pub jaccard: f64,
    pub cosine: f64,
}

impl CombinedWeights {
    pub fn combine(&self, jaccard: f64, cosine: f64) -> f64 {
        self.jaccard * jaccard + self.cosine * cosine
    }
}

/// One row of a place's materialised neighbor list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopKEntry {
    pub place_id: i64,
    pub neighbor_place_id: i64,
    pub rank: i64,
    pub jaccard: f64,
    pub cosine: f64,
    pub co_users: i64,
    pub updated_at: DateTime<Utc>,
}

impl TopKEntry {
    pub fn combined(&self, weights: CombinedWeights) -> f64 {
        weights.combine(self.jaccard, self.cosine)
    }
}

/// Result of a full similarity pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityReport {
    pub pairs_written: u64,
    pub pairs_skipped: u64,
    pub pairs_removed: u64,
    pub places_refreshed: u64,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityStatistics {
    pub total_pairs: i64,
    pub total_top_k_entries: i64,
    pub average_jaccard: f64,
    pub average_cosine: f64,
    pub sample_size: usize,
}

/// Outcome of refreshing neighbor lists for a batch of places.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopKRefreshReport {
    pub refreshed: u64,
    pub failed: u64,
    pub entries_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_canonicalised() {
        let now = Utc::now();
        let pair = PairwiseSimilarity::new(9, 3, 0.25, 0.4, 4, now).unwrap();
        assert_eq!(pair.place_id_low, 3);
        assert_eq!(pair.place_id_high, 9);
        assert_eq!(pair.neighbor_of(3), Some(9));
        assert_eq!(pair.neighbor_of(9), Some(3));
        assert_eq!(pair.neighbor_of(5), None);
    }

    #[test]
    fn test_self_pair_rejected() {
        let result = PairwiseSimilarity::new(4, 4, 0.1, 0.1, 1, Utc::now());
        assert!(matches!(result, Err(MoheError::Validation(_))));
    }

    #[test]
    fn test_out_of_range_scores_rejected() {
        let now = Utc::now();
        assert!(matches!(
            PairwiseSimilarity::new(1, 2, 1.2, 0.1, 1, now),
            Err(MoheError::InvariantViolation(_))
        ));
        assert!(matches!(
            PairwiseSimilarity::new(1, 2, 0.1, f64::NAN, 1, now),
            Err(MoheError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_46), 0.1235);
        assert_eq!(round4(0.123_44), 0.1234);
        assert_eq!(round4(0.25), 0.25);
        assert_eq!(round4(1.0 / 3.0), 0.3333);
    }
}
