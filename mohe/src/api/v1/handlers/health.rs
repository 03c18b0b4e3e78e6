use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;
use crate::llm::LlmBackend;
use crate::weather::WeatherBackend;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub llm: LlmStatus,
    pub weather: WeatherStatus,
    pub recalculation_running: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct WeatherStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let database = match state.db.ping().await {
        Ok(_) => DatabaseStatus {
            status: "ok".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DatabaseStatus {
                status: "error".to_string(),
            }
        }
    };

    let llm = if state.llm.is_available() {
        let provider = match state.llm.backend() {
            LlmBackend::OpenAI => "openai",
            LlmBackend::OpenRouter => "openrouter",
            LlmBackend::Ollama => "ollama",
            LlmBackend::LmStudio => "lmstudio",
            LlmBackend::OpenAICompatible { .. } => "openai-compatible",
            LlmBackend::Unavailable { .. } => "unavailable",
        };
        LlmStatus {
            status: "available".to_string(),
            provider: Some(provider.to_string()),
            model: state.llm.model_name().map(String::from),
        }
    } else {
        LlmStatus {
            status: "fallback".to_string(),
            provider: None,
            model: None,
        }
    };

    let weather = match state.weather.backend() {
        WeatherBackend::OpenWeatherMap { .. } => WeatherStatus {
            status: "available".to_string(),
            provider: Some("openweathermap".to_string()),
        },
        WeatherBackend::Mock => WeatherStatus {
            status: "available".to_string(),
            provider: Some("mock".to_string()),
        },
        WeatherBackend::Unavailable { .. } => WeatherStatus {
            status: "unavailable".to_string(),
            provider: None,
        },
    };

    let status = if database.status == "ok" { "ok" } else { "degraded" };
    ApiResponse::success(HealthData {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        llm,
        weather,
        recalculation_running: state.scheduler.is_calculation_running(),
    })
}
