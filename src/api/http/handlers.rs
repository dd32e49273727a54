// src/api/http/handlers.rs
// Small JSON handlers: health, section parsing, image search

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::types::{ImageSearchRequest, SectionsRequest};
use crate::attachment::DataUri;
use crate::sections::{self, ParsedAnswer};
use crate::search::SimilarArtwork;
use crate::state::AppState;

/// Health check handler
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.chat.model(),
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// `POST /api/sections`: split a finished answer into labelled sections
pub async fn sections_handler(
    payload: Result<Json<SectionsRequest>, JsonRejection>,
) -> ApiResult<Json<ParsedAnswer>> {
    let Json(request) = payload?;
    Ok(Json(sections::parse(&request.text)))
}

/// `POST /api/image-search`: proxy to the image similarity service
pub async fn image_search_handler(
    State(state): State<AppState>,
    payload: Result<Json<ImageSearchRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<SimilarArtwork>>> {
    let Json(request) = payload?;
    let image = DataUri::parse_lenient(&request.image_data)?;

    let results = state.image_search.search(&image).await?;
    info!(results = results.len(), "Image search served");
    Ok(Json(results))
}
