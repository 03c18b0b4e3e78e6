//! Weather collaborator used by contextual ranking.

mod cache;

use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use url::Url;

use crate::config::WeatherConfig;
use crate::error::{MoheError, Result};
use crate::models::{WeatherCondition, WeatherContext, WeatherSnapshot};

pub use cache::WeatherCache;

const OPENWEATHERMAP_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const MS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherBackend {
    OpenWeatherMap { base_url: String, api_key: String },
    /// Deterministic seasonal readings, for development without an API key.
    Mock,
    Unavailable { reason: String },
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
}

#[derive(Clone)]
pub struct WeatherProvider {
    backend: WeatherBackend,
    http: reqwest::Client,
    cache: WeatherCache,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Self {
        let backend = match (&config.api_key, config.provider.to_lowercase().as_str()) {
            (_, "mock") => WeatherBackend::Mock,
            (Some(api_key), _) => WeatherBackend::OpenWeatherMap {
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| OPENWEATHERMAP_BASE_URL.to_string()),
                api_key: api_key.clone(),
            },
            (None, _) => WeatherBackend::Unavailable {
                reason: "OPENWEATHERMAP_API_KEY is not configured".to_string(),
            },
        };

        let http = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
        {
            Ok(http) => http,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create weather HTTP client");
                return Self::unavailable(&e.to_string());
            }
        };

        Self {
            backend,
            http,
            cache: WeatherCache::new(config.cache_size, Duration::from_secs(config.cache_ttl_secs)),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: WeatherBackend::Unavailable {
                reason: reason.to_string(),
            },
            http: reqwest::Client::new(),
            cache: WeatherCache::new(1, Duration::ZERO),
        }
    }

    pub fn mock() -> Self {
        Self {
            backend: WeatherBackend::Mock,
            http: reqwest::Client::new(),
            cache: WeatherCache::new(1, Duration::ZERO),
        }
    }

    pub fn backend(&self) -> &WeatherBackend {
        &self.backend
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, WeatherBackend::Unavailable { .. })
    }

    /// Current weather at a coordinate, served from cache when fresh.
    pub async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        if let Some(snapshot) = self.cache.get(lat, lon) {
            tracing::debug!(lat, lon, "Weather cache hit");
            return Ok(snapshot);
        }

        let snapshot = match &self.backend {
            WeatherBackend::OpenWeatherMap { base_url, api_key } => {
                self.fetch_openweathermap(base_url, api_key, lat, lon).await?
            }
            WeatherBackend::Mock => seasonal_mock(Utc::now()),
            WeatherBackend::Unavailable { reason } => {
                return Err(MoheError::WeatherUnavailable(reason.clone()))
            }
        };

        self.cache.put(lat, lon, snapshot.clone());
        Ok(snapshot)
    }

    pub async fn get_context(&self, lat: f64, lon: f64) -> Result<WeatherContext> {
        self.current_weather(lat, lon)
            .await
            .map(WeatherContext::from_snapshot)
    }

    async fn fetch_openweathermap(
        &self,
        base_url: &str,
        api_key: &str,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherSnapshot> {
        let mut url = Url::parse(&format!("{}/weather", base_url.trim_end_matches('/')))?;
        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("appid", api_key)
            .append_pair("units", "metric");
        tracing::debug!(lat, lon, "Fetching weather from OpenWeatherMap");

        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MoheError::Weather(format!(
                "OpenWeatherMap returned status {status}"
            )));
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| MoheError::Weather(format!("Invalid OpenWeatherMap response: {e}")))?;

        Ok(parse_openweathermap(body, Utc::now()))
    }
}

fn parse_openweathermap(body: OwmResponse, observed_at: DateTime<Utc>) -> WeatherSnapshot {
    let (code, description) = body
        .weather
        .into_iter()
        .next()
        .map(|w| (w.main, w.description))
        .unwrap_or_else(|| ("unknown".to_string(), String::new()));
    let condition = WeatherCondition::from_provider_code(&code);

    WeatherSnapshot {
        temperature_c: body.main.temp,
        condition,
        condition_code: condition.to_string(),
        description,
        humidity: body.main.humidity,
        wind_speed_kmh: body.wind.and_then(|w| w.speed).map(|speed| speed * MS_TO_KMH),
        observed_at,
    }
}

/// Clear weather at the midpoint temperature of the season.
fn seasonal_mock(now: DateTime<Utc>) -> WeatherSnapshot {
    let temperature_c = match now.month() {
        12 | 1 | 2 => 10.0,
        3..=5 => 20.0,
        6..=8 => 30.0,
        _ => 17.5,
    };
    WeatherSnapshot {
        temperature_c,
        condition: WeatherCondition::Clear,
        condition_code: WeatherCondition::Clear.to_string(),
        description: "clear sky (mock data)".to_string(),
        humidity: Some(60.0),
        wind_speed_kmh: Some(10.0),
        observed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(provider: &str, api_key: Option<&str>) -> WeatherConfig {
        WeatherConfig {
            provider: provider.to_string(),
            api_key: api_key.map(String::from),
            ..WeatherConfig::default()
        }
    }

    #[test]
    fn test_backend_selection() {
        let provider = WeatherProvider::new(&config("openweathermap", Some("key")));
        assert!(matches!(provider.backend(), WeatherBackend::OpenWeatherMap { .. }));

        let provider = WeatherProvider::new(&config("mock", Some("key")));
        assert_eq!(provider.backend(), &WeatherBackend::Mock);

        let provider = WeatherProvider::new(&config("openweathermap", None));
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_unavailable_backend_errors() {
        let provider = WeatherProvider::unavailable("no key");
        let result = provider.get_context(37.5, 127.0).await;
        assert!(matches!(result, Err(MoheError::WeatherUnavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_base_url_is_rejected() {
        let provider = WeatherProvider::new(&WeatherConfig {
            base_url: Some("not a url".to_string()),
            ..config("openweathermap", Some("key"))
        });
        let result = provider.current_weather(37.5, 127.0).await;
        assert!(matches!(result, Err(MoheError::UrlParse(_))));
    }

    #[test]
    fn test_parse_openweathermap_body() {
        let body: OwmResponse = serde_json::from_str(
            r#"{"main": {"temp": 12.3, "humidity": 80}, "weather": [{"main": "Drizzle", "description": "light drizzle"}], "wind": {"speed": 2.0}}"#,
        )
        .unwrap();

        let snapshot = parse_openweathermap(body, Utc::now());

        assert_eq!(snapshot.condition, WeatherCondition::Rain);
        assert_eq!(snapshot.condition_code, "rain");
        assert_eq!(snapshot.humidity, Some(80.0));
        assert!((snapshot.wind_speed_kmh.unwrap() - 7.2).abs() < 1e-9);
        assert!(WeatherContext::from_snapshot(snapshot).is_rainy);
    }

    #[test]
    fn test_seasonal_mock() {
        let july = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(seasonal_mock(july).temperature_c, 30.0);
        assert_eq!(seasonal_mock(january).temperature_c, 10.0);
        assert!(WeatherContext::from_snapshot(seasonal_mock(july)).is_hot);
    }
}
