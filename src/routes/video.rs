use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::BOOKING_STATUS_CONFIRMED;
use crate::db::BookingRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token", post(issue_token))
        .route("/end/:booking_id", post(end_call))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub booking_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub channel: String,
    pub uid: u32,
    pub app_id: String,
    pub expires_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Mint an RTC token for a confirmed booking the caller participates in
async fn issue_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let booking = BookingRepository::find_by_id(&state.db, &request.booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.guest_id != user.id && booking.host_id != user.id {
        return Err(AppError::Forbidden);
    }
    if booking.status != BOOKING_STATUS_CONFIRMED {
        return Err(AppError::Conflict(
            "Only confirmed bookings have a call room".to_string(),
        ));
    }

    let token = state.video.issue_token(&booking.agora_channel)?;

    Ok(Json(TokenResponse {
        token: token.token,
        channel: token.channel,
        uid: token.uid,
        app_id: token.app_id,
        expires_at: token.expires_at.to_rfc3339(),
    }))
}

/// Mark the call finished; either participant may end it
async fn end_call(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(booking_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let booking = BookingRepository::find_by_id(&state.db, &booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.guest_id != user.id && booking.host_id != user.id {
        return Err(AppError::Forbidden);
    }

    let completed = BookingRepository::mark_completed(&state.db, &booking_id).await?;
    if completed {
        tracing::info!("Booking {} marked completed by user {}", booking_id, user.id);
    }

    Ok(Json(serde_json::json!({ "ok": true, "completed": completed })))
}
