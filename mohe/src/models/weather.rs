use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const COLD_BELOW_C: f64 = 10.0;
pub const HOT_ABOVE_C: f64 = 28.0;
pub const COMFORTABLE_RANGE_C: (f64, f64) = (18.0, 25.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Thunderstorm,
    Fog,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Map an OpenWeatherMap `main` condition group onto a normalised condition.
    pub fn from_provider_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" | "cloudy" => Self::Cloudy,
            "rain" | "drizzle" => Self::Rain,
            "snow" => Self::Snow,
            "thunderstorm" => Self::Thunderstorm,
            "mist" | "fog" | "haze" | "smoke" | "dust" => Self::Fog,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => write!(f, "clear"),
            Self::Cloudy => write!(f, "cloudy"),
            Self::Rain => write!(f, "rain"),
            Self::Snow => write!(f, "snow"),
            Self::Thunderstorm => write!(f, "thunderstorm"),
            Self::Fog => write!(f, "fog"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Point-in-time weather reading. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub condition: WeatherCondition,
    pub condition_code: String,
    pub description: String,
    pub humidity: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// A snapshot with derived flags used by contextual ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherContext {
    pub snapshot: WeatherSnapshot,
    pub is_rainy: bool,
    pub is_cold: bool,
    pub is_hot: bool,
    pub is_comfortable: bool,
    pub recommended_activities: Vec<String>,
}

impl WeatherContext {
    pub fn from_snapshot(snapshot: WeatherSnapshot) -> Self {
        let text = format!("{} {}", snapshot.condition_code, snapshot.description).to_lowercase();
        let is_rainy = snapshot.condition == WeatherCondition::Rain
            || snapshot.condition == WeatherCondition::Thunderstorm
            || text.contains("rain")
            || text.contains("shower");
        let temp = snapshot.temperature_c;
        let is_cold = temp < COLD_BELOW_C;
        let is_hot = temp > HOT_ABOVE_C;
        let is_comfortable = (COMFORTABLE_RANGE_C.0..=COMFORTABLE_RANGE_C.1).contains(&temp);

        let recommended_activities = if is_rainy {
            vec!["indoor cafe", "museum", "shopping mall"]
        } else if is_hot {
            vec!["air-conditioned cafe", "indoor shopping", "cinema"]
        } else if is_cold {
            vec!["warm cafe", "restaurant", "sauna"]
        } else if is_comfortable {
            vec!["park walk", "outdoor dining", "sightseeing"]
        } else {
            vec!["cafe", "restaurant"]
        }
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            snapshot,
            is_rainy,
            is_cold,
            is_hot,
            is_comfortable,
            recommended_activities,
        }
    }

    /// Short phrase describing the weather, e.g. "rainy weather (12°C)".
    pub fn describe(&self) -> String {
        let label = if self.is_rainy {
            "rainy weather"
        } else if self.is_hot {
            "hot weather"
        } else if self.is_cold {
            "cold weather"
        } else if self.is_comfortable {
            "pleasant weather"
        } else {
            "mild weather"
        };
        format!("{label} ({:.0}°C)", self.snapshot.temperature_c)
    }
}
