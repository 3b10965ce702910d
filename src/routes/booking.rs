use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::models::{Booking, BookingSession};
use crate::db::BookingRepository;
use crate::error::{AppError, AppErrorWithDetails, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::booking::{BookingService, NewSessionRequest};
use crate::services::pricing::{format_cents, ServiceSelection};
use crate::AppState;

/// Routes nested under /api/booking-session
pub fn session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_session))
        .route("/:session_id", get(get_session))
}

/// Routes nested under /api/bookings
pub fn bookings_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bookings))
        .route("/:id/cancel", post(cancel_booking))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub host_id: Option<String>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<String>,
    pub selected_duration: Option<i64>,
    #[serde(default)]
    pub selected_services: ServiceSelection,
    pub call_language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub host_id: String,
    pub selected_date: NaiveDate,
    pub selected_time: String,
    pub selected_duration: i64,
    pub selected_services: ServiceSelection,
    /// Decimal amount string, e.g. "105.00"
    pub total_price: String,
    pub currency: String,
    pub status: String,
    pub expires_at: NaiveDateTime,
}

impl From<BookingSession> for SessionResponse {
    fn from(session: BookingSession) -> Self {
        SessionResponse {
            session_id: session.id,
            host_id: session.host_id,
            selected_date: session.selected_date,
            selected_time: session.selected_time,
            selected_duration: session.selected_duration,
            selected_services: ServiceSelection {
                screen_sharing: session.screen_sharing,
                translation: session.translation,
                recording: session.recording,
                transcription: session.transcription,
            },
            total_price: format_cents(session.amount_cents),
            currency: session.currency,
            status: session.status,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub host_id: String,
    pub guest_id: String,
    pub scheduled_date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i64,
    /// Decimal amount string
    pub price: String,
    pub currency: String,
    pub status: String,
    pub call_language: Option<String>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            id: booking.id,
            host_id: booking.host_id,
            guest_id: booking.guest_id,
            scheduled_date: booking.scheduled_date,
            start_time: booking.start_time,
            duration_minutes: booking.duration_minutes,
            price: format_cents(booking.price_cents),
            currency: booking.currency,
            status: booking.status,
            call_language: booking.call_language,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an ephemeral booking session from finalized selections
async fn create_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppErrorWithDetails> {
    // Surface every missing selection at once for inline display.
    let mut missing = Vec::new();
    if request.host_id.is_none() {
        missing.push("hostId");
    }
    if request.selected_date.is_none() {
        missing.push("selectedDate");
    }
    if request.selected_time.is_none() {
        missing.push("selectedTime");
    }
    if request.selected_duration.is_none() {
        missing.push("selectedDuration");
    }
    if !missing.is_empty() {
        return Err(
            AppError::Validation(crate::i18n::tr(
                user.lang.as_deref(),
                "validation.missing_selection",
                None,
            ))
            .with_details(serde_json::json!({ "missing": missing })),
        );
    }

    let session = BookingService::create_session(
        &state,
        &user,
        NewSessionRequest {
            host_id: request.host_id.unwrap_or_default(),
            selected_date: request.selected_date.unwrap_or_default(),
            selected_time: request.selected_time.unwrap_or_default(),
            selected_duration: request.selected_duration.unwrap_or_default(),
            services: request.selected_services,
            call_language: request.call_language,
        },
    )
    .await?;

    Ok(Json(session.into()))
}

/// Fetch a session for checkout (owner only)
async fn get_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
) -> AppResult<Json<SessionResponse>> {
    let session = crate::db::BookingSessionRepository::find_by_id(&state.db, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking session not found".to_string()))?;

    if session.guest_id != user.id {
        return Err(AppError::Forbidden);
    }

    Ok(Json(session.into()))
}

/// The caller's bookings, as guest and as host
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = BookingRepository::list_for_user(&state.db, &user.id).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// Cancel a confirmed booking (guest or host)
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookingResponse>> {
    BookingService::cancel_booking(&state, &user, &id).await?;

    let booking = BookingRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    Ok(Json(booking.into()))
}
