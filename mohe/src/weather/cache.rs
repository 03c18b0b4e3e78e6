use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use crate::models::WeatherSnapshot;

/// Thread-safe LRU cache of weather readings with a fixed time to live.
///
/// Keys are coordinates rounded to four decimals, so nearby requests share
/// one upstream call.
#[derive(Clone)]
pub struct WeatherCache {
    cache: Arc<Mutex<LruCache<String, (WeatherSnapshot, Instant)>>>,
    ttl: Duration,
}

impl WeatherCache {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    pub fn key(lat: f64, lon: f64) -> String {
        format!("{lat:.4},{lon:.4}")
    }

    /// A cached reading younger than the TTL. Expired entries are evicted.
    pub fn get(&self, lat: f64, lon: f64) -> Option<WeatherSnapshot> {
        let key = Self::key(lat, lon);
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match cache.get(&key) {
            Some((snapshot, stored_at)) if stored_at.elapsed() < self.ttl => Some(snapshot.clone()),
            Some(_) => {
                cache.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, lat: f64, lon: f64, snapshot: WeatherSnapshot) {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.put(Self::key(lat, lon), (snapshot, Instant::now()));
    }

    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherCondition;
    use chrono::Utc;

    fn snapshot(temp: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_c: temp,
            condition: WeatherCondition::Clear,
            condition_code: "clear".to_string(),
            description: "clear sky".to_string(),
            humidity: None,
            wind_speed_kmh: None,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_nearby_coordinates_share_an_entry() {
        let cache = WeatherCache::new(10, Duration::from_secs(600));
        cache.put(37.566_51, 126.978_04, snapshot(20.0));

        assert_eq!(cache.get(37.566_54, 126.978_01).map(|s| s.temperature_c), Some(20.0));
        assert!(cache.get(37.6, 126.9).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_not_served() {
        let cache = WeatherCache::new(10, Duration::from_secs(600));
        cache.put(1.0, 2.0, snapshot(12.0));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get(1.0, 2.0).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(1.0, 2.0).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_enforcement() {
        let cache = WeatherCache::new(2, Duration::from_secs(600));
        cache.put(1.0, 1.0, snapshot(1.0));
        cache.put(2.0, 2.0, snapshot(2.0));
        cache.put(3.0, 3.0, snapshot(3.0));

        assert!(cache.get(1.0, 1.0).is_none());
        assert_eq!(cache.len(), 2);
    }
}
