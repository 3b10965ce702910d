use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::db::{PricingRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::routes::pricing::PricingOptionResponse;
use crate::services::pricing::ServiceSelection;
use crate::services::scheduling::SchedulingService;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(search_hosts))
        .route("/:id", get(get_host))
        .route("/:id/slots", get(get_slots))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Public host card: no email, no Stripe internals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub host_title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostProfileResponse {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub host_title: Option<String>,
    pub host_bio: Option<String>,
    pub services: ServiceSelection,
    pub pricing: Vec<PricingOptionResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub slots: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Public host directory with optional name/title search
async fn search_hosts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<HostSummary>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let hosts = UserRepository::search_hosts(
        &state.db,
        query.q.as_deref().unwrap_or(""),
        limit,
        offset,
    )
    .await?;

    Ok(Json(hosts.into_iter().map(summarize).collect()))
}

/// Public host profile with pricing and offered add-on services
async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<HostProfileResponse>> {
    let host = find_host(&state, &id).await?;
    let pricing = PricingRepository::list_for_host(&state.db, &host.id).await?;

    Ok(Json(HostProfileResponse {
        id: host.id,
        display_name: host.display_name,
        avatar_url: host.avatar_url,
        host_title: host.host_title,
        host_bio: host.host_bio,
        services: ServiceSelection {
            screen_sharing: host.screen_sharing_enabled,
            translation: host.translation_enabled,
            recording: host.recording_enabled,
            transcription: host.transcription_enabled,
        },
        pricing: pricing.into_iter().map(Into::into).collect(),
    }))
}

/// Bookable start times for a host on a date. An empty list means the date
/// is fully unavailable and the picker should disable it.
async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<SlotsResponse>> {
    let host = find_host(&state, &id).await?;

    let slots = SchedulingService::bookable_slots(
        &state.db,
        &host.id,
        query.date,
        state.config.booking.slot_increment_minutes,
    )
    .await?;

    Ok(Json(SlotsResponse {
        date: query.date,
        slots,
    }))
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn find_host(state: &Arc<AppState>, id: &str) -> AppResult<User> {
    UserRepository::find_by_id(&state.db, id)
        .await?
        .filter(|u| u.is_host)
        .ok_or_else(|| AppError::NotFound("Host not found".to_string()))
}

fn summarize(host: User) -> HostSummary {
    HostSummary {
        id: host.id,
        display_name: host.display_name,
        avatar_url: host.avatar_url,
        host_title: host.host_title,
    }
}
