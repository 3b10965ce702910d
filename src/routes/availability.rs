use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{CreateHostAvailability, HostAvailability};
use crate::db::AvailabilityRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthHost;
use crate::services::scheduling::parse_hhmm;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_availability).post(create_availability))
        .route("/:id", axum::routing::delete(delete_availability))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAvailabilityRequest {
    pub day_of_week: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub id: String,
    pub day_of_week: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
}

impl From<HostAvailability> for AvailabilityResponse {
    fn from(record: HostAvailability) -> Self {
        AvailabilityResponse {
            id: record.id,
            day_of_week: record.day_of_week,
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List the authenticated host's availability records
async fn list_availability(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
) -> AppResult<Json<Vec<AvailabilityResponse>>> {
    let records = AvailabilityRepository::list_for_host(&state.db, &host.id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Add a recurring or date-specific availability window
async fn create_availability(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
    Json(request): Json<CreateAvailabilityRequest>,
) -> AppResult<Json<AvailabilityResponse>> {
    let record = validate_window(request)?;
    let created = AvailabilityRepository::create(&state.db, &host.id, record).await?;
    Ok(Json(created.into()))
}

/// Remove one availability window
async fn delete_availability(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !AvailabilityRepository::delete(&state.db, &host.id, &id).await? {
        return Err(AppError::NotFound("Availability record not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn validate_window(request: CreateAvailabilityRequest) -> AppResult<CreateHostAvailability> {
    match (request.day_of_week, request.date) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "Set either day_of_week or date, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(AppError::Validation(
                "Set day_of_week for a weekly window or date for a one-off".to_string(),
            ))
        }
        _ => {}
    }

    if let Some(day) = request.day_of_week {
        if !(0..=6).contains(&day) {
            return Err(AppError::Validation(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
    }

    let start = parse_hhmm(&request.start_time)
        .ok_or_else(|| AppError::Validation("start_time must be HH:MM".to_string()))?;
    let end = parse_hhmm(&request.end_time)
        .ok_or_else(|| AppError::Validation("end_time must be HH:MM".to_string()))?;
    if start >= end {
        return Err(AppError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }

    Ok(CreateHostAvailability {
        day_of_week: request.day_of_week,
        date: request.date,
        start_time: request.start_time,
        end_time: request.end_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        day_of_week: Option<i64>,
        date: Option<&str>,
        start: &str,
        end: &str,
    ) -> CreateAvailabilityRequest {
        CreateAvailabilityRequest {
            day_of_week,
            date: date.map(|d| d.parse().unwrap()),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn accepts_weekly_and_one_off_windows() {
        assert!(validate_window(request(Some(1), None, "09:00", "12:00")).is_ok());
        assert!(validate_window(request(None, Some("2026-09-01"), "09:00", "12:00")).is_ok());
    }

    #[test]
    fn rejects_ambiguous_or_empty_recurrence() {
        assert!(validate_window(request(Some(1), Some("2026-09-01"), "09:00", "12:00")).is_err());
        assert!(validate_window(request(None, None, "09:00", "12:00")).is_err());
    }

    #[test]
    fn rejects_inverted_window_and_bad_weekday() {
        assert!(validate_window(request(Some(1), None, "12:00", "09:00")).is_err());
        assert!(validate_window(request(Some(1), None, "09:00", "09:00")).is_err());
        assert!(validate_window(request(Some(7), None, "09:00", "12:00")).is_err());
        assert!(validate_window(request(Some(1), None, "9am", "12:00")).is_err());
    }
}
