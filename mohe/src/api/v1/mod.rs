pub mod dto;
pub mod handlers;
pub mod openapi;
pub mod response;
pub mod router;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::NamedTempFile;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::api::routes::create_router;
    use crate::api::state::AppState;
    use crate::config::{Config, DatabaseConfig};
    use crate::db::{Database, DatabaseBackend, LibSqlBackend};
    use crate::llm::LlmProvider;
    use crate::models::{Place, User};
    use crate::weather::WeatherProvider;

    async fn test_state() -> (AppState, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let config = Config {
            database: DatabaseConfig::local(temp_file.path().to_str().unwrap()),
            llm: None,
            ..Config::default()
        };

        let raw_db = Database::new(&config.database).await.unwrap();
        let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));
        let llm = LlmProvider::new(config.llm.as_ref());

        let state = AppState::new(
            config,
            db,
            llm,
            WeatherProvider::mock(),
            CancellationToken::new(),
        );
        (state, temp_file)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_components() {
        let (state, _tmp) = test_state().await;
        let app = create_router(state);

        let response = app.oneshot(get("/api/v1/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json.get("error").is_none(), "success should NOT have 'error' key");
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"]["status"], "ok");
        assert_eq!(json["data"]["llm"]["status"], "fallback");
        assert_eq!(json["data"]["weather"]["provider"], "mock");
        assert_eq!(json["data"]["recalculationRunning"], false);
    }

    #[tokio::test]
    async fn openapi_json_is_valid() {
        let (state, _tmp) = test_state().await;
        let app = create_router(state);

        let response = app.oneshot(get("/api/v1/openapi.json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"]
            .as_str()
            .expect("openapi field should be a string");
        assert!(
            version.starts_with("3"),
            "OpenAPI version should start with 3, got: {version}"
        );
        assert!(json["paths"]
            .get("/api/v1/users/{userId}/recommendations")
            .is_some());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found_envelope() {
        let (state, _tmp) = test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(get("/api/v1/users/404/recommendations"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert!(json.get("data").is_none(), "error response should NOT have 'data' key");
        assert_eq!(json["error"]["code"], "not_found");
        assert!(json["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn recommendations_carry_algorithm_meta() {
        // Given: a user without bookmarks and one rated place
        let (state, _tmp) = test_state().await;
        state.db.upsert_user(&User::new(1).with_mbti("INFP")).await.unwrap();
        let mut place = Place::new(10, "연남 카페");
        place.category = Some("카페".to_string());
        place.rating = 4.6;
        place.review_count = 120;
        state.db.upsert_place(&place).await.unwrap();
        let app = create_router(state);

        // When
        let response = app
            .oneshot(get("/api/v1/users/1/recommendations?limit=5"))
            .await
            .unwrap();

        // Then: the rating fallback answers
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["meta"]["algorithm"], "rating_based_filtered");
        assert_eq!(json["data"]["recommendations"][0]["id"], 10);
    }

    #[tokio::test]
    async fn invalid_limit_is_rejected() {
        let (state, _tmp) = test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(get("/api/v1/users/1/recommendations?limit=0"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn refresh_top_k_requires_ids() {
        let (state, _tmp) = test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(post_json("/api/v1/similarities:refreshTopK", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mark_dirty_reports_pending() {
        let (state, _tmp) = test_state().await;
        let app = create_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/v1/admin/places:markDirty",
                r#"{"placeIds":[3,1,3]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["marked"], 3);
        assert_eq!(json["data"]["pending"], 2);
        assert_eq!(state.scheduler.dirty_count(), 2);
    }

    #[tokio::test]
    async fn recalculation_trigger_reports_running_pass() {
        // Given: a pass already holds the flag
        let (state, _tmp) = test_state().await;
        assert!(state.scheduler.flag().try_start());
        let app = create_router(state.clone());

        // When
        let response = app
            .oneshot(post_json("/api/v1/admin/similarities:recalculate", ""))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["started"], false);
        assert_eq!(json["data"]["status"], "already_running");
        state.scheduler.flag().finish();
    }
}
