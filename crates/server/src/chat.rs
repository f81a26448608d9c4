use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use optibot_agent::DialogueRuntime;

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<DialogueRuntime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatError {
    pub error: String,
}

pub fn router(runtime: Arc<DialogueRuntime>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(ChatState { runtime })
}

/// One dialogue turn per request. A blank `user_id` is the only rejection:
/// everything after that point resolves to some reply, fallback included.
pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatError>)> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ChatError { error: "user_id must not be blank".to_string() }),
        ));
    }

    let correlation_id = Uuid::new_v4();
    info!(
        event_name = "chat.turn.received",
        correlation_id = %correlation_id,
        user_id = %user_id,
        message_chars = request.message.chars().count(),
        "chat turn received"
    );

    let reply = state.runtime.process_turn(user_id, &request.message).await;

    info!(
        event_name = "chat.turn.answered",
        correlation_id = %correlation_id,
        user_id = %user_id,
        reply_chars = reply.chars().count(),
        "chat turn answered"
    );

    Ok(Json(ChatResponse { reply }))
}
