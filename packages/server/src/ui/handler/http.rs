//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RoomName,
    infrastructure::dto::http::{RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.hub.room_summaries().await;

    // Domain Model から DTO への変換
    let room_summaries = rooms
        .into_iter()
        .map(|(name, member_count)| RoomSummaryDto {
            name: name.into_string(),
            member_count,
        })
        .collect();

    Json(room_summaries)
}

/// Get room detail by name
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room = RoomName::new(name).map_err(|e| {
        tracing::debug!("Invalid room name in path: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    match state.hub.room_snapshot(&room).await {
        Some(snapshot) => Ok(Json(RoomDetailDto::from(snapshot))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
