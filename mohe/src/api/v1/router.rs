use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let users = Router::new()
        .route(
            "/{userId}/recommendations",
            get(handlers::recommendations::get_recommendations),
        )
        .route(
            "/{userId}/similar-places",
            get(handlers::vectors::similar_places),
        )
        .route(
            "/{userId}/places/{placeId}/similarity",
            get(handlers::vectors::user_place_similarity),
        );

    let similarities = Router::new().route(
        "/statistics",
        get(handlers::similarities::statistics),
    );

    let admin = Router::new()
        .route(
            "/similarities:recalculate",
            post(handlers::admin::trigger_recalculation),
        )
        .route(
            "/similarities/status",
            get(handlers::admin::recalculation_status),
        )
        .route("/places:markDirty", post(handlers::admin::mark_dirty));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
        .route(
            "/recommendations:contextual",
            post(handlers::contextual::contextual_recommendations),
        )
        .route(
            "/similarities:calculatePair",
            post(handlers::similarities::calculate_pair),
        )
        .route(
            "/similarities:refreshTopK",
            post(handlers::similarities::refresh_top_k),
        )
        .nest("/users", users)
        .nest("/similarities", similarities)
        .nest("/admin", admin)
}
