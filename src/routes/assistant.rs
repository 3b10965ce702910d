use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::assistant::ChatMessage;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// "guest" | "host" | "admin"; defaults to guest
    pub user_role: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// One Loomia assistant turn
async fn chat(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let assistant_guard = state.assistant.read().await;
    let assistant = assistant_guard.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable(crate::i18n::tr(
            user.lang.as_deref(),
            "assistant.unavailable",
            None,
        ))
    })?;

    let user_role = request.user_role.as_deref().unwrap_or("guest");
    let reply = assistant
        .chat(message, user_role, &request.conversation_history)
        .await?;

    Ok(Json(ChatResponse { reply }))
}
