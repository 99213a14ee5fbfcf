//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{AnalyzeQuery, ErrorResponse, HealthResponse, RulesResponse, StatesResponse},
};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use biocascade_core::ValueMap;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::for_registry(state.engine.registry()))
}

// =============================================================================
// REGISTRY HANDLERS
// =============================================================================

/// List every derivable target and its candidate methods.
pub async fn rules_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(RulesResponse::for_registry(state.engine.registry())),
    )
}

/// List the physiological state definitions.
pub async fn states_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatesResponse::for_registry(state.engine.registry())),
    )
}

// =============================================================================
// ANALYZE HANDLER
// =============================================================================

/// Run one analysis.
///
/// The body is the flat input map. Bad JSON is a 400 with an
/// [`ErrorResponse`]; implausible values are reported inside the result.
pub async fn analyze_handler(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    body: Result<Json<ValueMap>, JsonRejection>,
) -> Response {
    let input = match body {
        Ok(Json(input)) => input,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected analyze body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!(
                    "Invalid input map: {}",
                    rejection.body_text()
                ))),
            )
                .into_response();
        }
    };

    let result = state.engine.analyze_with(&input, query.limits());
    tracing::info!(
        inputs = result.summary.direct_inputs,
        derived = result.summary.derived,
        status = ?result.validation.status,
        "analysis served"
    );

    (StatusCode::OK, Json(result)).into_response()
}
