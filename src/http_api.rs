use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::SubmitError;
use crate::room::{RoomManager, RoomSnapshot};
use crate::round::SubmitOutcome;

/// Thin JSON surface for the connection-handling layer: room enumeration,
/// join, and the submit path every player (and bot) goes through.
#[derive(Clone)]
pub struct ApiState {
    pub manager: Arc<RoomManager>,
}

#[derive(Serialize)]
pub struct RoomListEntry {
    pub id: String,
    pub label: String,
    pub grid_size: usize,
    pub players: usize,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub nick: String,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub round_id: String,
    pub nick: String,
    pub word: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SubmitError>,
}

impl From<Result<SubmitOutcome, SubmitError>> for SubmitResponse {
    fn from(result: Result<SubmitOutcome, SubmitError>) -> Self {
        match result {
            Ok(outcome) => SubmitResponse {
                ok: true,
                score: Some(outcome.total_score),
                word_score: Some(outcome.word_score),
                error: None,
            },
            Err(error) => SubmitResponse {
                ok: false,
                score: None,
                word_score: None,
                error: Some(error),
            },
        }
    }
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/:room_id", get(get_room))
        .route("/api/rooms/:room_id/join", post(join_room))
        .route("/api/rooms/:room_id/submit", post(submit_word))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}

async fn list_rooms(State(state): State<ApiState>) -> Json<Vec<RoomListEntry>> {
    let mut rooms = Vec::new();
    for handle in state.manager.iter() {
        let players = match handle.snapshot().await {
            Some(snapshot) => snapshot.players.len(),
            None => 0,
        };
        rooms.push(RoomListEntry {
            id: handle.config().id.clone(),
            label: handle.config().label.clone(),
            grid_size: handle.config().grid_size,
            players,
        });
    }
    Json(rooms)
}

async fn get_room(
    Path(room_id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<RoomSnapshot>, axum::http::StatusCode> {
    let Some(handle) = state.manager.get(&room_id) else {
        return Err(axum::http::StatusCode::NOT_FOUND);
    };
    match handle.snapshot().await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err(axum::http::StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn join_room(
    Path(room_id): Path<String>,
    State(state): State<ApiState>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<serde_json::Value>, axum::http::StatusCode> {
    let Some(handle) = state.manager.get(&room_id) else {
        return Err(axum::http::StatusCode::NOT_FOUND);
    };
    handle.join(request.nick).await;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn submit_word(
    Path(room_id): Path<String>,
    State(state): State<ApiState>,
    Json(request): Json<SubmitRequest>,
) -> Json<SubmitResponse> {
    let result = state
        .manager
        .submit(&room_id, request.round_id, request.nick, request.word)
        .await;
    Json(SubmitResponse::from(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_response_shapes() {
        let ok = SubmitResponse::from(Ok(SubmitOutcome {
            word: "cat".into(),
            word_score: 5,
            total_score: 12,
            notes: vec![],
        }));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["score"], 12);
        assert_eq!(json["word_score"], 5);
        assert!(json.get("error").is_none());

        let err = SubmitResponse::from(Err(SubmitError::AlreadyPlayed));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "already_played");
        assert!(json.get("score").is_none());
    }
}
