use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minimum rating for a place to be recommendable on its own merits.
pub const RECOMMENDABLE_MIN_RATING: f64 = 3.0;

/// Places opened within this many days are recommendable regardless of rating.
pub const NEW_PLACE_WINDOW_DAYS: i64 = 183;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: f64,
    pub review_count: i64,
    pub opening_hours: Option<String>,
    pub tags: Vec<String>,
    pub amenities: Vec<String>,
    pub is_new_place: bool,
    pub opened_date: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
}

impl Place {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
            description: None,
            location: None,
            latitude: None,
            longitude: None,
            rating: 0.0,
            review_count: 0,
            opening_hours: None,
            tags: Vec::new(),
            amenities: Vec::new(),
            is_new_place: false,
            opened_date: None,
            first_seen_at: Utc::now(),
        }
    }

    /// A place is recommendable when it is well rated, flagged new, or opened recently.
    pub fn is_recommendable(&self, now: DateTime<Utc>) -> bool {
        if self.rating >= RECOMMENDABLE_MIN_RATING || self.is_new_place {
            return true;
        }
        self.opened_date
            .map(|opened| now - opened <= Duration::days(NEW_PLACE_WINDOW_DAYS))
            .unwrap_or(false)
    }

    pub fn is_recently_opened(&self, now: DateTime<Utc>) -> bool {
        self.is_new_place
            || self
                .opened_date
                .map(|opened| now - opened <= Duration::days(NEW_PLACE_WINDOW_DAYS))
                .unwrap_or(false)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or("기타")
    }
}

/// An MBTI-specific description attached to a place by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceMbtiDescription {
    pub place_id: i64,
    pub mbti: String,
    pub description: String,
}
