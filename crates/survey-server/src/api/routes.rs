//! REST API routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use survey_core::{
    AreaDetectionRequest, AreaDetectionResponse, HealthResponse, LatLon, PathPlanRequest,
    PathPlanResponse, PlannerError, SurveyPlanner,
};

use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/area/detect", post(detect_area_handler))
        .route("/v1/path/plan", post(plan_path_handler))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        raster_source: state.raster_source_name().to_string(),
    })
}

/// Map a pipeline error to an HTTP status: caller mistakes are 400, failures
/// of the raster provider or the projection are 502.
fn error_status(err: &PlannerError) -> StatusCode {
    if err.is_configuration() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}

async fn detect_area_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AreaDetectionRequest>,
) -> impl IntoResponse {
    let errors = request.validate_within(state.config().max_extent_m);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(AreaDetectionResponse::failure(errors)));
    }

    let config = state.survey_defaults();
    let source = state.raster_source();
    let coordinates = request.coordinates();
    let result = tokio::task::spawn_blocking(move || {
        let planner = SurveyPlanner::new(config, source.as_ref());
        let detection = planner.detect_area(&coordinates)?;
        let boundary = detection.boundary()?;
        let obstacles = detection.obstacles()?;
        Ok::<_, PlannerError>((detection.stats, boundary, obstacles))
    })
    .await;

    match result {
        Ok(Ok((stats, boundary, obstacles))) => {
            let ok = !boundary.is_empty();
            let errors = if ok {
                Vec::new()
            } else {
                vec!["no area detected around the input points".to_string()]
            };
            tracing::info!(
                points = request.points.len(),
                boundary = boundary.len(),
                obstacles = obstacles.len(),
                tiles = stats.tiles,
                "Area detection finished"
            );
            let response = AreaDetectionResponse {
                ok,
                boundary: boundary.into_iter().map(LatLon::from).collect(),
                obstacles: obstacles
                    .into_iter()
                    .map(|ring| ring.into_iter().map(LatLon::from).collect())
                    .collect(),
                stats: Some(stats),
                errors,
                generated_at: Utc::now(),
            };
            (StatusCode::OK, Json(response))
        }
        Ok(Err(err)) => {
            tracing::warn!("Area detection failed: {}", err);
            (error_status(&err), Json(AreaDetectionResponse::failure(vec![err.to_string()])))
        }
        Err(err) => {
            tracing::error!("Area detection task failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AreaDetectionResponse::failure(vec!["area detection task failed".to_string()])),
            )
        }
    }
}

async fn plan_path_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PathPlanRequest>,
) -> impl IntoResponse {
    let errors = request.validate_within(state.config().max_extent_m);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(PathPlanResponse::failure(errors)));
    }

    let config = request.apply_to(state.survey_defaults());
    let source = state.raster_source();
    let coordinates = request.coordinates();
    let result = tokio::task::spawn_blocking(move || {
        SurveyPlanner::new(config, source.as_ref()).plan(&coordinates)
    })
    .await;

    match result {
        Ok(Ok(plan)) => {
            tracing::info!(
                points = request.points.len(),
                waypoints = plan.path.len(),
                minutes = plan.travel_time_min,
                "Path plan finished"
            );
            (StatusCode::OK, Json(PathPlanResponse::from_plan(plan)))
        }
        Ok(Err(err)) => {
            tracing::warn!("Path planning failed: {}", err);
            (error_status(&err), Json(PathPlanResponse::failure(vec![err.to_string()])))
        }
        Err(err) => {
            tracing::error!("Path planning task failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PathPlanResponse::failure(vec!["path planning task failed".to_string()])),
            )
        }
    }
}
