//! HTTP front-end for survey area detection and coverage path planning.

pub mod api;
pub mod cache;
pub mod config;
pub mod raster_client;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router for `state`.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config().allowed_origin.as_deref());
    api::routes()
        .with_state(state)
        .layer(middleware::from_fn(api::request_id::ensure_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => origin,
        Some(Err(err)) => {
            tracing::warn!("Ignoring invalid SURVEY_ALLOWED_ORIGIN: {}", err);
            return CorsLayer::permissive();
        }
        None => return CorsLayer::permissive(),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, api::request_id::REQUEST_ID_HEADER])
}
