//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    domain::UserId,
    infrastructure::dto::http::{HealthResponse, LocationRecordDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = if state.gateway.is_durable() {
        "connected"
    } else {
        "cache-only"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        connected_sessions: state.registry.session_count().await,
        database: database.to_string(),
    })
}

/// Query parameters for the location history endpoint
#[derive(Debug, Deserialize)]
pub struct LocationsQuery {
    pub limit: Option<usize>,
}

/// Get recent locations for a user, newest first
pub async fn get_user_locations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<LocationsQuery>,
) -> Result<Json<Vec<LocationRecordDto>>, StatusCode> {
    let user_id = match UserId::new(user_id) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Invalid user_id in location history request: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let limit = query.limit.unwrap_or(100);

    match state.gateway.recent_locations(&user_id, limit).await {
        Ok(records) => {
            // 履歴のないユーザーは空配列（404 ではない）
            let dtos: Vec<LocationRecordDto> =
                records.iter().map(LocationRecordDto::from).collect();
            Ok(Json(dtos))
        }
        Err(e) => {
            tracing::error!("Failed to read locations for '{}': {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
