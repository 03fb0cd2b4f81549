//! REST endpoints exposing the onboarding session to a presentation layer.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::manager::{DEFAULT_RECOMMENDATIONS, OnboardingManager, OnboardingStatus};
use crate::error::SessionError;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct LoadingBody {
    loading: bool,
}

#[derive(Debug, Deserialize)]
struct RecommendationParams {
    limit: Option<usize>,
}

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotSkippable { .. } | SessionError::AlreadyCompleted => StatusCode::CONFLICT,
        SessionError::UnknownPack(_) | SessionError::InvalidSnapshot(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::UnknownStep { .. }
        | SessionError::NoDisplayableStep { .. }
        | SessionError::Faulted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: SessionError) -> Response {
    (
        status_for(&err),
        Json(json!({"error": err.to_string(), "fatal": err.is_fatal()})),
    )
        .into_response()
}

fn respond(result: Result<OnboardingStatus, SessionError>) -> Response {
    match result {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "fithero-onboarding"
    }))
}

/// GET /api/onboarding/session
async fn get_session(State(state): State<OnboardingRouteState>) -> Response {
    match state.manager.view().await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/response
///
/// Stores a draft answer for the current step and validates it.
async fn set_response(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<ResponseBody>,
) -> Response {
    respond(state.manager.set_response(body.value).await)
}

/// POST /api/onboarding/next
async fn next_step(State(state): State<OnboardingRouteState>) -> Response {
    respond(state.manager.next().await)
}

/// POST /api/onboarding/back
async fn previous_step(State(state): State<OnboardingRouteState>) -> Response {
    respond(state.manager.back().await)
}

/// POST /api/onboarding/skip
async fn skip_step(State(state): State<OnboardingRouteState>) -> Response {
    respond(state.manager.skip().await)
}

/// POST /api/onboarding/tips
async fn toggle_tips(State(state): State<OnboardingRouteState>) -> Response {
    respond(state.manager.toggle_tips().await)
}

/// POST /api/onboarding/loading
async fn set_loading(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<LoadingBody>,
) -> Response {
    respond(state.manager.set_loading(body.loading).await)
}

/// PATCH /api/onboarding/data
///
/// Merges a partial profile object, e.g. `{"selectedPack": "wellness"}`.
async fn update_data(
    State(state): State<OnboardingRouteState>,
    Json(partial): Json<Map<String, Value>>,
) -> Response {
    respond(state.manager.update_data(&partial).await)
}

/// GET /api/onboarding/recommendations?limit=3
async fn recommendations(
    State(state): State<OnboardingRouteState>,
    Query(params): Query<RecommendationParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_RECOMMENDATIONS);
    Json(state.manager.recommendations(limit).await)
}

/// GET /api/onboarding/profile
async fn get_profile(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.manager.profile().await)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
        ])
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/session", get(get_session))
        .route("/api/onboarding/response", post(set_response))
        .route("/api/onboarding/next", post(next_step))
        .route("/api/onboarding/back", post(previous_step))
        .route("/api/onboarding/skip", post(skip_step))
        .route("/api/onboarding/tips", post(toggle_tips))
        .route("/api/onboarding/loading", post(set_loading))
        .route("/api/onboarding/data", patch(update_data))
        .route("/api/onboarding/recommendations", get(recommendations))
        .route("/api/onboarding/profile", get(get_profile))
        .layer(cors())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            status_for(&SessionError::NotSkippable { step: "x".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&SessionError::AlreadyCompleted), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&SessionError::UnknownPack("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&SessionError::UnknownStep {
                from: "a".into(),
                to: "b".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
