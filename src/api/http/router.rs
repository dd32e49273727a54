// src/api/http/router.rs
// HTTP router composition

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::chat::chat_with_vision;
use super::handlers::{health_handler, image_search_handler, sections_handler};
use crate::config::QuestConfig;
use crate::state::AppState;

/// Build the service router.
///
/// The body limit applies to every JSON extractor; base64 image payloads are
/// far larger than axum's 2 MB default.
pub fn create_router(state: AppState, config: &QuestConfig) -> Router {
    let api_router = Router::new()
        .route("/chat-with-vision", post(chat_with_vision))
        .route("/image-search", post(image_search_handler))
        .route("/sections", post(sections_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes()))
        .layer(cors_layer(&config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Invalid CORS origin '{}', allowing any origin", origin);
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
