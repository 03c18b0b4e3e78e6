use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::WeatherSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Daypart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Daypart {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Morning => "the morning",
            Self::Afternoon => "the afternoon",
            Self::Evening => "the evening",
            Self::Night => "late night",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextualRequest {
    pub query: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextualPlace {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub rating: f64,
    pub review_count: i64,
    pub distance_m: Option<f64>,
    pub is_open: bool,
    pub score: f64,
    pub weather_suitability: Option<String>,
    pub time_suitability: Option<String>,
    pub reason_why: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchContext {
    pub query: String,
    pub extracted_keywords: Vec<String>,
    pub weather: Option<WeatherSnapshot>,
    pub daypart: Daypart,
    #[schema(value_type = String)]
    pub local_time: NaiveDateTime,
    pub location_description: String,
    pub recommendation_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextualResponse {
    pub places: Vec<ContextualPlace>,
    pub search_context: SearchContext,
    pub total_results: usize,
}
