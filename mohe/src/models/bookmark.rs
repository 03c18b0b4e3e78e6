use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's bookmark of a place. `mbti` is the user's MBTI when the bookmark was made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub user_id: i64,
    pub place_id: i64,
    pub mbti: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(user_id: i64, place_id: i64, mbti: Option<String>) -> Self {
        Self {
            user_id,
            place_id,
            mbti,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated co-bookmark evidence for one unordered place pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CoOccurrence {
    pub place_id_low: i64,
    pub place_id_high: i64,
    pub co_users: i64,
    pub weighted_co_users: f64,
    pub last_co_bookmark_at: DateTime<Utc>,
}
