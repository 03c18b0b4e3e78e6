mod common;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{place, seed_places, temp_db};
use mohe::config::{ContextConfig, VectorConfig, WeatherConfig};
use mohe::keywords::KeywordExtractor;
use mohe::llm::LlmProvider;
use mohe::models::{
    ContextualRequest, Daypart, ExtractionSource, PreferenceVector, SelectedKeyword, VectorOwner,
    WeatherCondition,
};
use mohe::services::{ContextualService, EMPTY_MESSAGE};
use mohe::weather::WeatherProvider;

const CENTER: (f64, f64) = (37.5665, 126.9780);

fn weather_config(base_url: String) -> WeatherConfig {
    WeatherConfig {
        provider: "openweathermap".to_string(),
        api_key: Some("owm-test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 2,
        ..WeatherConfig::default()
    }
}

async fn mount_weather(server: &MockServer, condition: &str, temp: f64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("appid", "owm-test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "main": {"temp": temp, "humidity": 90},
            "weather": [{"main": condition, "description": format!("light {}", condition.to_lowercase())}],
            "wind": {"speed": 3.0}
        })))
        .mount(server)
        .await;
}

fn located(id: i64, category: &str, rating: f64, offset: f64) -> mohe::models::Place {
    let mut p = place(id, category, rating, 150);
    p.latitude = Some(CENTER.0 + offset);
    p.longitude = Some(CENTER.1);
    p
}

fn service(db: std::sync::Arc<dyn mohe::db::DatabaseBackend>, weather: WeatherProvider) -> ContextualService {
    let extractor = KeywordExtractor::new(LlmProvider::new(None), &VectorConfig::default());
    ContextualService::new(db, weather, extractor, ContextConfig::default())
}

fn request(query: &str) -> ContextualRequest {
    ContextualRequest {
        query: query.to_string(),
        lat: CENTER.0,
        lon: CENTER.1,
        // 11:00 in Seoul
        timestamp: Some(Utc.with_ymd_and_hms(2024, 6, 3, 2, 0, 0).unwrap()),
        limit: 10,
        max_distance_km: Some(5.0),
    }
}

#[tokio::test]
async fn rainy_weather_prefers_indoor_places() {
    // Given: an equally rated café and park at the same distance, and rain
    let server = MockServer::start().await;
    mount_weather(&server, "Rain", 18.0).await;
    let (db, _tmp) = temp_db().await;
    seed_places(&db, &[located(1, "공원", 4.3, 0.005), located(2, "카페", 4.3, 0.005)]).await;
    let service = service(db, WeatherProvider::new(&weather_config(server.uri())));

    // When
    let response = service.recommend(&request("비 오는 날 카페")).await.unwrap();

    // Then
    let ids: Vec<i64> = response.places.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(
        response.places[0].weather_suitability.as_deref(),
        Some("Great for a rainy day")
    );
    assert_eq!(
        response.places[1].weather_suitability.as_deref(),
        Some("Not ideal in the rain")
    );
    assert!(response.places[0].reason_why.contains("Great for a rainy day"));

    let context = &response.search_context;
    assert_eq!(context.daypart, Daypart::Morning);
    assert_eq!(
        context.weather.as_ref().map(|w| w.condition),
        Some(WeatherCondition::Rain)
    );
    assert!(context.extracted_keywords.contains(&"cafe".to_string()));
    assert!(context.recommendation_message.contains("rainy weather"));
    assert_eq!(response.total_results, 2);
}

#[tokio::test]
async fn closed_and_distant_places_rank_low_or_drop_out() {
    // Given: an open café, an evening-only bar, and a café far outside the radius
    let server = MockServer::start().await;
    mount_weather(&server, "Clear", 22.0).await;
    let (db, _tmp) = temp_db().await;
    let mut bar = located(3, "bar", 4.8, 0.001);
    bar.opening_hours = Some("18:00-02:00".to_string());
    seed_places(
        &db,
        &[located(1, "카페", 4.0, 0.01), bar, located(4, "카페", 4.9, 0.5)],
    )
    .await;
    let service = service(db, WeatherProvider::new(&weather_config(server.uri())));

    // When
    let response = service.recommend(&request("카페")).await.unwrap();

    // Then
    let ids: Vec<i64> = response.places.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert!(!response.places[1].is_open);
    assert_eq!(response.places[1].reason_why, "Currently closed");
}

#[tokio::test]
async fn weather_outage_still_ranks_places() {
    // Given: the weather endpoint fails
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (db, _tmp) = temp_db().await;
    seed_places(&db, &[located(1, "카페", 4.2, 0.002)]).await;
    let service = service(db, WeatherProvider::new(&weather_config(server.uri())));

    // When
    let response = service.recommend(&request("카페")).await.unwrap();

    // Then: no weather signal, the message falls back to a neutral phrase
    assert_eq!(response.places.len(), 1);
    assert!(response.search_context.weather.is_none());
    assert!(response.places[0].weather_suitability.is_none());
    assert!(response
        .search_context
        .recommendation_message
        .contains("the current conditions"));
}

async fn store_place_vector(
    db: &std::sync::Arc<dyn mohe::db::DatabaseBackend>,
    place_id: i64,
    keywords: &[&str],
) {
    let extractor = KeywordExtractor::new(LlmProvider::new(None), &VectorConfig::default());
    let selected: Vec<SelectedKeyword> = keywords
        .iter()
        .map(|name| {
            let definition = extractor.catalog().find(name).unwrap();
            SelectedKeyword {
                keyword_id: definition.id,
                keyword: definition.keyword.to_string(),
                confidence: 0.9,
                reasoning: None,
            }
        })
        .collect();
    let vector = PreferenceVector {
        owner: VectorOwner::Place,
        owner_id: place_id,
        vector: extractor.build_vector(&selected).unwrap(),
        selected_keywords: selected,
        extraction_source: ExtractionSource::Llm,
        model_name: None,
        prompt_hash: None,
        confidence: 0.9,
        version: 1,
        created_at: Utc::now(),
    };
    db.save_vector(&vector).await.unwrap();
}

#[tokio::test]
async fn empty_catalog_returns_neutral_message() {
    // Given: no places at all
    let (db, _tmp) = temp_db().await;
    let service = service(db, WeatherProvider::unavailable("disabled"));

    // When
    let response = service.recommend(&request("카페")).await.unwrap();

    // Then
    assert!(response.places.is_empty());
    assert_eq!(response.total_results, 0);
    assert_eq!(response.search_context.recommendation_message, EMPTY_MESSAGE);
}

#[tokio::test]
async fn query_vector_ranks_and_filters_candidates() {
    // Given: three identical bookstores, one matching the query vector,
    // one with an unrelated vector and one without any vector
    let (db, _tmp) = temp_db().await;
    seed_places(
        &db,
        &[
            located(1, "서점", 4.0, 0.003),
            located(2, "서점", 4.0, 0.003),
            located(3, "서점", 4.0, 0.003),
        ],
    )
    .await;
    store_place_vector(&db, 3, &["specialty_coffee", "quiet_space"]).await;
    store_place_vector(&db, 2, &["craft_beer"]).await;
    let service = service(db, WeatherProvider::unavailable("disabled"));

    // When
    let response = service.recommend(&request("quiet coffee")).await.unwrap();

    // Then: the matching place leads, the unrelated one is dropped
    let ids: Vec<i64> = response.places.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 1]);
    assert!(response.places[0].score > response.places[1].score);
    assert_eq!(response.places[0].reason_why, "Matches what you are looking for");
}

#[tokio::test]
async fn invalid_coordinates_are_rejected() {
    let (db, _tmp) = temp_db().await;
    let service = service(db, WeatherProvider::mock());
    let mut bad = request("카페");
    bad.lat = 123.0;

    let result = service.recommend(&bad).await;

    assert!(matches!(result, Err(mohe::error::MoheError::Validation(_))));
}
