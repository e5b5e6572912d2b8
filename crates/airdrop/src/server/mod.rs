mod error;
mod tokens;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};

use airdrop_core::TokenService;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub tokens: TokenService,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

// Bodies are a handful of short fields; anything larger is abuse.
const BODY_LIMIT: usize = 64 * 1024;

pub fn build_router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let shared = Arc::new(state);

    let router = Router::new()
        .route("/health", get(health))
        .route("/auth", get(tokens::list_tokens).post(tokens::issue_token))
        .route(
            "/auth/{token}",
            put(tokens::update_token).delete(tokens::delete_token),
        )
        .route(
            "/auth/{token}/account",
            post(tokens::add_account).delete(tokens::remove_account),
        )
        .route("/auth/{token}/verify", post(tokens::verify_account))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(shared);

    match cors_origin {
        Some(origin) => router.layer(cors_layer(origin)),
        None => router,
    }
}

/// Only reflect the configured origin when the request's Origin header
/// matches it exactly, so other origins get a clean CORS rejection.
fn cors_layer(allowed: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &HeaderValue, _| *request_origin == allowed,
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn route_not_found() -> error::AppError {
    error::AppError::NotFound("Route not found".to_string())
}
