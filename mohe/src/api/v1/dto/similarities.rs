//! Similarity maintenance DTOs.

use serde::{Deserialize, Serialize};

use crate::models::PairwiseSimilarity;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePairRequest {
    pub place_id_a: i64,
    pub place_id_b: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePairResponse {
    /// `None` when the places share no bookmarks.
    pub similarity: Option<PairwiseSimilarity>,
}

/// Either a single place or a list of places.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTopKRequest {
    pub place_id: Option<i64>,
    #[serde(default)]
    pub place_ids: Vec<i64>,
}

impl RefreshTopKRequest {
    /// All requested ids, deduplicated in request order.
    pub fn place_ids(&self) -> Vec<i64> {
        let mut ids = Vec::with_capacity(self.place_ids.len() + 1);
        for id in self.place_id.into_iter().chain(self.place_ids.iter().copied()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_request_merges_ids() {
        let req: RefreshTopKRequest =
            serde_json::from_str(r#"{"placeId": 3, "placeIds": [1, 3, 2]}"#).unwrap();
        assert_eq!(req.place_ids(), vec![3, 1, 2]);

        let req: RefreshTopKRequest = serde_json::from_str("{}").unwrap();
        assert!(req.place_ids().is_empty());
    }
}
