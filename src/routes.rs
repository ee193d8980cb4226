// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, review},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every engine route requires a resolved identity.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let assessment_routes = Router::new()
        .route("/{slug}/overview", get(assessment::overview))
        .route("/{slug}/questions", get(assessment::question_payload))
        .route("/{slug}/start", post(assessment::start))
        .route("/{slug}/submit", post(assessment::submit))
        .route("/{slug}/attempts", get(review::list_attempts));

    let attempt_routes = Router::new().route("/{id}/evaluate", post(review::evaluate));

    Router::new()
        .nest("/api/assessments", assessment_routes)
        .nest("/api/attempts", attempt_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Global middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
