use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::ContextConfig;
use crate::db::{DatabaseBackend, GeoBounds};
use crate::error::{MoheError, Result};
use crate::keywords::KeywordExtractor;
use crate::models::{
    round4, ContextualPlace, ContextualRequest, ContextualResponse, Daypart, Place, SearchContext,
    VectorOwner, WeatherContext,
};
use crate::services::{cosine_similarity, EMPTY_MESSAGE};
use crate::weather::WeatherProvider;

const EARTH_RADIUS_KM: f64 = 6371.0;
const KM_PER_DEGREE: f64 = 111.32;
const DISTANCE_SCALE_KM: f64 = 10.0;
const HIGH_RATING_MIN: f64 = 4.5;
const KEYWORD_BOOST: f64 = 0.05;
const OPEN_BOOST: f64 = 0.2;
const CLOSED_PENALTY: f64 = -0.3;
const DAYPART_BOOST: f64 = 0.05;
const VECTOR_MATCH_WEIGHT: f64 = 0.2;
const VECTOR_REASON_MIN: f64 = 0.3;
const MAX_LIMIT: usize = 100;

const INDOOR: &[&str] = &["카페", "cafe", "레스토랑", "restaurant", "쇼핑", "shopping", "박물관", "museum"];
const OUTDOOR: &[&str] = &["공원", "park", "해변", "beach", "산", "mountain", "야외", "outdoor"];
const AIR_CONDITIONED: &[&str] = &["카페", "cafe", "쇼핑몰", "mall", "백화점", "department", "영화관", "cinema"];
const SHADED: &[&str] = &["공원", "park", "정원", "garden", "숲", "forest"];
const WARM: &[&str] = &["카페", "cafe", "레스토랑", "restaurant", "찜질방", "sauna"];

const MORNING_AFFINITY: &[&str] = &["카페", "cafe", "브런치", "breakfast", "brunch", "bakery"];
const AFTERNOON_AFFINITY: &[&str] = &["카페", "cafe", "lunch", "점심"];
const EVENING_AFFINITY: &[&str] = &["레스토랑", "restaurant", "bar", "pub", "술집", "이자카야"];
const NIGHT_AFFINITY: &[&str] = &["bar", "club", "late-night", "pub", "술집", "포차"];

static HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2})\s*[-~]\s*(\d{1,2}):(\d{2})").expect("opening hours regex must compile")
});

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Degree box around a point that contains every place within `km`.
///
/// A box that would cross the antimeridian or reach a pole spans every
/// longitude; the haversine pass trims it afterwards.
pub fn bounding_box(lat: f64, lon: f64, km: f64) -> GeoBounds {
    let lat_delta = km / KM_PER_DEGREE;
    let min_lat = (lat - lat_delta).max(-90.0);
    let max_lat = (lat + lat_delta).min(90.0);

    let cos_lat = lat.to_radians().cos().abs();
    let lon_delta = if cos_lat < 1e-6 {
        f64::INFINITY
    } else {
        km / (KM_PER_DEGREE * cos_lat)
    };
    let wraps = min_lat <= -90.0
        || max_lat >= 90.0
        || lon - lon_delta < -180.0
        || lon + lon_delta > 180.0;
    let (min_lon, max_lon) = if wraps {
        (-180.0, 180.0)
    } else {
        (lon - lon_delta, lon + lon_delta)
    };

    GeoBounds {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}

fn parse_time(hour: &str, minute: &str) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour == 24 && minute == 0 {
        return NaiveTime::from_hms_opt(23, 59, 59);
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Whether `hours` ("HH:MM-HH:MM") covers `at`. Missing or unreadable hours count as open.
pub fn is_open_at(hours: Option<&str>, at: NaiveTime) -> bool {
    let Some(captures) = hours.and_then(|h| HOURS_RE.captures(h)) else {
        return true;
    };
    let (Some(open), Some(close)) = (
        parse_time(&captures[1], &captures[2]),
        parse_time(&captures[3], &captures[4]),
    ) else {
        return true;
    };

    match open.cmp(&close) {
        std::cmp::Ordering::Less => at >= open && at < close,
        std::cmp::Ordering::Greater => at >= open || at < close,
        std::cmp::Ordering::Equal => true,
    }
}

/// Sum of rating, proximity and review-volume terms.
pub fn base_score(rating: f64, distance_km: Option<f64>, review_count: i64) -> f64 {
    let rating_term = 0.3 * (rating.clamp(0.0, 5.0) / 5.0);
    let distance_term = distance_km
        .map(|d| 0.2 * (1.0 - d / DISTANCE_SCALE_KM).max(0.0))
        .unwrap_or(0.0);
    let review_term = 0.1 * (((review_count.max(0) + 1) as f64).log10() / 4.0).min(1.0);
    rating_term + distance_term + review_term
}

fn mentions(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// Weather adjustment and its label for a category.
pub fn weather_boost(category: &str, weather: &WeatherContext) -> (f64, Option<&'static str>) {
    let category = category.to_lowercase();
    let indoor = mentions(&category, INDOOR);
    let outdoor = mentions(&category, OUTDOOR);

    if weather.is_rainy {
        if indoor {
            (0.15, Some("Great for a rainy day"))
        } else if outdoor {
            (-0.1, Some("Not ideal in the rain"))
        } else {
            (0.0, None)
        }
    } else if weather.is_hot {
        if mentions(&category, AIR_CONDITIONED) {
            (0.1, Some("Cool escape from the heat"))
        } else if outdoor && !mentions(&category, SHADED) {
            (-0.05, Some("Exposed to the heat"))
        } else {
            (0.0, None)
        }
    } else if weather.is_cold {
        if indoor || mentions(&category, WARM) {
            (0.1, Some("Warm spot on a cold day"))
        } else {
            (0.0, None)
        }
    } else if weather.is_comfortable && outdoor {
        (0.05, Some("Perfect weather to be outside"))
    } else {
        (0.0, None)
    }
}

/// Opening-hours adjustment plus daypart affinity for a category.
pub fn time_boost(category: &str, is_open: bool, daypart: Daypart) -> (f64, Option<String>) {
    if !is_open {
        return (CLOSED_PENALTY, Some("Closed now".to_string()));
    }
    let affinity = match daypart {
        Daypart::Morning => MORNING_AFFINITY,
        Daypart::Afternoon => AFTERNOON_AFFINITY,
        Daypart::Evening => EVENING_AFFINITY,
        Daypart::Night => NIGHT_AFFINITY,
    };
    if mentions(&category.to_lowercase(), affinity) {
        (
            OPEN_BOOST + DAYPART_BOOST,
            Some(format!("Good choice for {}", daypart.describe())),
        )
    } else {
        (OPEN_BOOST, Some("Open now".to_string()))
    }
}

/// Inputs shared by every candidate of one contextual query.
#[derive(Debug, Clone)]
pub struct RankingContext<'a> {
    pub weather: Option<&'a WeatherContext>,
    pub local_time: NaiveDateTime,
    pub location: Option<(f64, f64)>,
    pub keywords: &'a [String],
    /// Cosine similarity between the query vector and each place's stored vector.
    pub vector_scores: Option<&'a HashMap<i64, f64>>,
}

/// Score one place in context.
pub fn score_place(place: &Place, context: &RankingContext<'_>) -> ContextualPlace {
    let distance_km = match (context.location, place.coordinates()) {
        (Some((lat, lon)), Some((p_lat, p_lon))) => Some(haversine_km(lat, lon, p_lat, p_lon)),
        _ => None,
    };
    let category = place.category.clone().unwrap_or_default();
    let daypart = Daypart::from_hour(context.local_time.hour());
    let is_open = is_open_at(place.opening_hours.as_deref(), context.local_time.time());

    let mut score = base_score(place.rating, distance_km, place.review_count);

    let (weather_delta, weather_label) = context
        .weather
        .map(|w| weather_boost(&category, w))
        .unwrap_or((0.0, None));
    score += weather_delta;

    let (time_delta, time_label) = time_boost(&category, is_open, daypart);
    score += time_delta;

    let haystack = format!(
        "{} {} {}",
        place.name,
        category,
        place.description.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    let matched: Vec<&String> = context
        .keywords
        .iter()
        .filter(|kw| !kw.is_empty() && haystack.contains(&kw.to_lowercase()))
        .collect();
    score += KEYWORD_BOOST * matched.len() as f64;

    let vector_match = context
        .vector_scores
        .and_then(|scores| scores.get(&place.id))
        .copied();
    score += VECTOR_MATCH_WEIGHT * vector_match.unwrap_or(0.0);

    let reason_why = if !is_open {
        "Currently closed".to_string()
    } else {
        let mut reasons: Vec<String> = Vec::new();
        if weather_delta > 0.0 {
            reasons.extend(weather_label.map(String::from));
        }
        if time_delta > OPEN_BOOST {
            reasons.extend(time_label.clone());
        }
        if place.rating >= HIGH_RATING_MIN {
            reasons.push(format!("Highly rated ({:.1})", place.rating));
        }
        if let Some(keyword) = matched.first() {
            reasons.push(format!("Related to '{keyword}'"));
        } else if vector_match.is_some_and(|similarity| similarity >= VECTOR_REASON_MIN) {
            reasons.push("Matches what you are looking for".to_string());
        }
        if reasons.is_empty() {
            "Popular place nearby".to_string()
        } else {
            reasons.join(", ")
        }
    };

    ContextualPlace {
        id: place.id,
        name: place.name.clone(),
        category: place.category.clone(),
        rating: place.rating,
        review_count: place.review_count,
        distance_m: distance_km.map(|d| (d * 1000.0).round()),
        is_open,
        score: round4(score),
        weather_suitability: weather_label.map(String::from),
        time_suitability: time_label,
        reason_why,
    }
}

/// Score and order places, best first, ties by id.
pub fn rank(places: &[Place], context: &RankingContext<'_>, limit: usize) -> Vec<ContextualPlace> {
    let mut scored: Vec<ContextualPlace> = places.iter().map(|p| score_place(p, context)).collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    scored.truncate(limit);
    scored
}

/// Re-ranks nearby places using weather, time of day and query keywords.
#[derive(Clone)]
pub struct ContextualService {
    db: Arc<dyn DatabaseBackend>,
    weather: WeatherProvider,
    extractor: KeywordExtractor,
    config: ContextConfig,
}

impl ContextualService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        weather: WeatherProvider,
        extractor: KeywordExtractor,
        config: ContextConfig,
    ) -> Self {
        Self {
            db,
            weather,
            extractor,
            config,
        }
    }

    async fn weather_context(&self, lat: f64, lon: f64) -> Option<WeatherContext> {
        if !self.weather.is_available() {
            return None;
        }
        let timeout = Duration::from_secs(self.config.weather_timeout_secs);
        match tokio::time::timeout(timeout, self.weather.get_context(lat, lon)).await {
            Ok(Ok(context)) => Some(context),
            Ok(Err(e)) => {
                warn!(error = %e, "Weather lookup failed, ranking without weather");
                None
            }
            Err(_) => {
                warn!(timeout_secs = self.config.weather_timeout_secs, "Weather lookup timed out");
                None
            }
        }
    }

    /// Recommendable places within the radius, nearest first.
    pub async fn nearby_candidates(&self, lat: f64, lon: f64, max_distance_km: f64) -> Result<Vec<Place>> {
        let now = Utc::now();
        let bounds = bounding_box(lat, lon, max_distance_km);
        let mut nearby: Vec<(f64, Place)> = self
            .db
            .places_within(bounds)
            .await?
            .into_iter()
            .filter(|place| place.is_recommendable(now))
            .filter_map(|place| {
                let (p_lat, p_lon) = place.coordinates()?;
                let distance = haversine_km(lat, lon, p_lat, p_lon);
                (distance <= max_distance_km).then_some((distance, place))
            })
            .collect();

        nearby.sort_by(|(dist_a, a), (dist_b, b)| dist_a.total_cmp(dist_b).then(a.id.cmp(&b.id)));
        nearby.truncate(self.config.candidate_cap);
        Ok(nearby.into_iter().map(|(_, place)| place).collect())
    }

    /// Cosine similarity of each candidate's stored place vector to the query vector.
    ///
    /// Candidates without a stored vector are absent from the map.
    pub async fn vector_scores(
        &self,
        query_vector: &[f64],
        candidates: &[Place],
    ) -> Result<HashMap<i64, f64>> {
        let mut scores = HashMap::with_capacity(candidates.len());
        for place in candidates {
            if let Some(stored) = self.db.get_vector(VectorOwner::Place, place.id).await? {
                if stored.vector.len() == query_vector.len() {
                    scores.insert(place.id, cosine_similarity(query_vector, &stored.vector));
                }
            }
        }
        Ok(scores)
    }

    /// Keep candidates without a vector and those whose vector resembles the query.
    fn filter_by_vector(&self, candidates: Vec<Place>, scores: &HashMap<i64, f64>) -> Vec<Place> {
        candidates
            .into_iter()
            .filter(|place| {
                scores
                    .get(&place.id)
                    .map_or(true, |similarity| *similarity > self.config.vector_min_similarity)
            })
            .collect()
    }

    pub async fn recommend(&self, request: &ContextualRequest) -> Result<ContextualResponse> {
        if !(-90.0..=90.0).contains(&request.lat) || !(-180.0..=180.0).contains(&request.lon) {
            return Err(MoheError::Validation(format!(
                "Invalid coordinates: {}, {}",
                request.lat, request.lon
            )));
        }
        let max_distance_km = request
            .max_distance_km
            .filter(|km| km.is_finite() && *km > 0.0)
            .unwrap_or(self.config.default_max_distance_km);
        let limit = request.limit.clamp(1, MAX_LIMIT);

        let timestamp = request.timestamp.unwrap_or_else(Utc::now);
        let local_time = timestamp.naive_utc()
            + ChronoDuration::hours(i64::from(self.config.utc_offset_hours));
        let daypart = Daypart::from_hour(local_time.hour());

        let keyword_timeout = Duration::from_secs(self.config.keyword_timeout_secs);
        let (weather, keywords) = tokio::join!(
            self.weather_context(request.lat, request.lon),
            self.extractor.extract_query_keywords(&request.query, keyword_timeout),
        );

        let mut candidates = self
            .nearby_candidates(request.lat, request.lon, max_distance_km)
            .await?;
        debug!(
            candidates = candidates.len(),
            max_distance_km,
            "Loaded contextual candidates"
        );

        let vector_scores = match self.extractor.query_vector(&request.query, &keywords) {
            Ok(Some(query_vector)) => {
                let scores = self.vector_scores(&query_vector, &candidates).await?;
                let before = candidates.len();
                candidates = self.filter_by_vector(candidates, &scores);
                debug!(
                    scored = scores.len(),
                    dropped = before - candidates.len(),
                    "Applied query vector to candidates"
                );
                Some(scores)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Query vector unavailable, ranking without it");
                None
            }
        };

        let context = RankingContext {
            weather: weather.as_ref(),
            local_time,
            location: Some((request.lat, request.lon)),
            keywords: &keywords,
            vector_scores: vector_scores.as_ref(),
        };
        let places = rank(&candidates, &context, limit);

        let weather_desc = weather
            .as_ref()
            .map(WeatherContext::describe)
            .unwrap_or_else(|| "the current conditions".to_string());
        let search_context = SearchContext {
            query: request.query.clone(),
            extracted_keywords: keywords.clone(),
            weather: weather.map(|w| w.snapshot),
            daypart,
            local_time,
            location_description: format!("lat {:.4}, lon {:.4}", request.lat, request.lon),
            recommendation_message: if places.is_empty() {
                EMPTY_MESSAGE.to_string()
            } else {
                format!(
                    "Recommended considering {weather_desc} and {}",
                    daypart.describe()
                )
            },
        };

        info!(
            query = %request.query,
            results = places.len(),
            daypart = ?daypart,
            "Contextual recommendations ready"
        );
        Ok(ContextualResponse {
            total_results: places.len(),
            places,
            search_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_backend;
    use crate::llm::LlmProvider;
    use crate::config::VectorConfig;
    use crate::models::{WeatherCondition, WeatherSnapshot};
    use chrono::NaiveDate;

    fn weather(temp: f64, code: &str) -> WeatherContext {
        WeatherContext::from_snapshot(WeatherSnapshot {
            temperature_c: temp,
            condition: WeatherCondition::from_provider_code(code),
            condition_code: code.to_lowercase(),
            description: code.to_lowercase(),
            humidity: Some(80.0),
            wind_speed_kmh: Some(5.0),
            observed_at: Utc::now(),
        })
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    fn place(id: i64, category: &str, lat: f64, lon: f64) -> Place {
        let mut place = Place::new(id, format!("Place {id}"));
        place.category = Some(category.to_string());
        place.latitude = Some(lat);
        place.longitude = Some(lon);
        place.rating = 4.6;
        place.review_count = 120;
        place.opening_hours = Some("09:00-22:00".to_string());
        place
    }

    #[test]
    fn test_haversine_and_bounds() {
        let d = haversine_km(37.5665, 126.9780, 37.5665, 126.9780);
        assert!(d.abs() < 1e-9);
        let one_degree = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((one_degree - 111.19).abs() < 0.1);

        let bounds = bounding_box(37.5, 127.0, 11.132);
        assert!((bounds.max_lat - 37.6).abs() < 1e-9);
        assert!(bounds.max_lon - 127.0 > 0.1);
    }

    #[test]
    fn test_bounds_near_antimeridian_and_poles() {
        let east = bounding_box(0.0, 179.95, 20.0);
        assert_eq!((east.min_lon, east.max_lon), (-180.0, 180.0));

        let polar = bounding_box(89.95, 10.0, 20.0);
        assert_eq!(polar.max_lat, 90.0);
        assert_eq!((polar.min_lon, polar.max_lon), (-180.0, 180.0));

        let seoul = bounding_box(37.5, 127.0, 5.0);
        assert!(seoul.min_lon > 126.9 && seoul.max_lon < 127.1);
    }

    #[test]
    fn test_opening_hours() {
        let hours = Some("09:00-22:00");
        assert!(is_open_at(hours, NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert!(!is_open_at(hours, NaiveTime::from_hms_opt(22, 0, 0).unwrap()));
        assert!(!is_open_at(hours, NaiveTime::from_hms_opt(8, 59, 0).unwrap()));

        let overnight = Some("18:00-02:00");
        assert!(is_open_at(overnight, NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(is_open_at(overnight, NaiveTime::from_hms_opt(1, 0, 0).unwrap()));
        assert!(!is_open_at(overnight, NaiveTime::from_hms_opt(12, 0, 0).unwrap()));

        assert!(is_open_at(None, NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
        assert!(is_open_at(Some("by appointment"), NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
        assert!(is_open_at(Some("10:00-24:00"), NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
    }

    #[test]
    fn test_base_score_terms() {
        assert!((base_score(5.0, Some(0.0), 9999) - 0.6).abs() < 1e-9);
        assert!((base_score(0.0, Some(20.0), 0)).abs() < 1e-9);
    }

    #[test]
    fn test_rainy_cafe_beats_park() {
        // Given an indoor cafe and an outdoor park, both 500m away and open
        let rain = weather(15.0, "Rain");
        let cafe = place(1, "cafe", 37.5710, 126.9780);
        let park = place(2, "park", 37.5710, 126.9780);
        let context = RankingContext {
            weather: Some(&rain),
            local_time: at(14, 0),
            location: Some((37.5665, 126.9780)),
            keywords: &[],
            vector_scores: None,
        };

        // When
        let ranked = rank(&[park, cafe], &context, 10);

        // Then
        assert_eq!(ranked[0].id, 1);
        assert!(ranked[0].score > ranked[1].score);
        assert_eq!(ranked[0].weather_suitability.as_deref(), Some("Great for a rainy day"));
        assert_eq!(ranked[1].weather_suitability.as_deref(), Some("Not ideal in the rain"));
        assert!(ranked[0].reason_why.starts_with("Great for a rainy day"));
    }

    #[test]
    fn test_closed_place_is_penalised_not_excluded() {
        let mut bar = place(3, "bar", 37.5665, 126.9780);
        bar.opening_hours = Some("18:00-02:00".to_string());
        let context = RankingContext {
            weather: None,
            local_time: at(10, 0),
            location: Some((37.5665, 126.9780)),
            keywords: &[],
            vector_scores: None,
        };

        let scored = score_place(&bar, &context);

        assert!(!scored.is_open);
        assert_eq!(scored.reason_why, "Currently closed");
        assert_eq!(scored.time_suitability.as_deref(), Some("Closed now"));
    }

    #[test]
    fn test_keyword_and_default_reasons() {
        let keywords = vec!["dessert".to_string(), "cafe".to_string()];
        let mut plain = place(4, "bookstore", 37.5665, 126.9780);
        plain.rating = 3.5;
        let mut sweet = plain.clone();
        sweet.id = 5;
        sweet.description = Some("Dessert and tea".to_string());
        let context = RankingContext {
            weather: None,
            local_time: at(14, 0),
            location: Some((37.5665, 126.9780)),
            keywords: &keywords,
            vector_scores: None,
        };

        let plain = score_place(&plain, &context);
        let sweet = score_place(&sweet, &context);

        assert_eq!(plain.reason_why, "Popular place nearby");
        assert_eq!(sweet.reason_why, "Related to 'dessert'");
        assert!((sweet.score - plain.score - KEYWORD_BOOST).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_recommend_filters_by_distance_and_builds_context() {
        // Given two nearby places and one far away
        let (db, _tmp) = temp_backend().await;
        db.upsert_place(&place(1, "cafe", 37.5700, 126.9780)).await.unwrap();
        db.upsert_place(&place(2, "park", 37.5600, 126.9800)).await.unwrap();
        db.upsert_place(&place(3, "cafe", 35.1796, 129.0756)).await.unwrap();
        let extractor = KeywordExtractor::new(LlmProvider::unavailable("test"), &VectorConfig::default());
        let service = ContextualService::new(
            db,
            WeatherProvider::unavailable("test"),
            extractor,
            ContextConfig::default(),
        );
        let request = ContextualRequest {
            query: "조용한 카페".to_string(),
            lat: 37.5665,
            lon: 126.9780,
            timestamp: "2024-06-03T00:30:00Z".parse().ok(),
            limit: 10,
            max_distance_km: Some(5.0),
        };

        // When
        let response = service.recommend(&request).await.unwrap();

        // Then
        let ids: Vec<i64> = response.places.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&3));
        assert_eq!(response.search_context.daypart, Daypart::Morning);
        assert_eq!(response.search_context.location_description, "lat 37.5665, lon 126.9780");
        assert_eq!(
            response.search_context.recommendation_message,
            "Recommended considering the current conditions and the morning"
        );
        assert!(response.search_context.extracted_keywords.contains(&"cafe".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected() {
        let (db, _tmp) = temp_backend().await;
        let extractor = KeywordExtractor::new(LlmProvider::unavailable("test"), &VectorConfig::default());
        let service = ContextualService::new(db, WeatherProvider::unavailable("test"), extractor, ContextConfig::default());
        let request = ContextualRequest {
            query: "cafe".to_string(),
            lat: 120.0,
            lon: 0.0,
            timestamp: None,
            limit: 10,
            max_distance_km: None,
        };
        assert!(matches!(service.recommend(&request).await, Err(MoheError::Validation(_))));
    }
}
