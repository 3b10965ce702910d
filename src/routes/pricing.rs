use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::PricingOption;
use crate::db::PricingRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthHost;
use crate::services::pricing::{format_cents, parse_decimal_cents};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_pricing).post(upsert_pricing))
        .route("/:id", axum::routing::delete(delete_pricing))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingOptionResponse {
    pub id: String,
    pub duration_minutes: i64,
    /// Decimal amount string, e.g. "90.00"
    pub price: String,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<PricingOption> for PricingOptionResponse {
    fn from(option: PricingOption) -> Self {
        PricingOptionResponse {
            id: option.id,
            duration_minutes: option.duration_minutes,
            price: format_cents(option.price_cents),
            currency: option.currency,
            created_at: option.created_at,
            updated_at: option.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPricingRequest {
    pub duration_minutes: i64,
    /// Decimal amount string, e.g. "90" or "90.50"
    pub price: String,
    pub currency: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// The authenticated host's per-duration price list
async fn list_pricing(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
) -> AppResult<Json<Vec<PricingOptionResponse>>> {
    let options = PricingRepository::list_for_host(&state.db, &host.id).await?;
    Ok(Json(options.into_iter().map(Into::into).collect()))
}

/// Create or update the price for one duration
async fn upsert_pricing(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
    Json(request): Json<UpsertPricingRequest>,
) -> AppResult<Json<PricingOptionResponse>> {
    if request.duration_minutes < 0 || request.duration_minutes % 15 != 0 {
        return Err(AppError::Validation(
            "duration_minutes must be a non-negative multiple of 15".to_string(),
        ));
    }

    let price_cents = parse_decimal_cents(&request.price)
        .map_err(|e| AppError::Validation(format!("Invalid price: {}", e)))?;

    // Duration 0 is the free introductory consultation.
    if request.duration_minutes == 0 && price_cents != 0 {
        return Err(AppError::Validation(
            "A free consultation (duration 0) must have price 0".to_string(),
        ));
    }

    let currency = request
        .currency
        .map(|c| c.to_lowercase())
        .unwrap_or_else(|| state.config.stripe.default_currency.clone());

    let option = PricingRepository::upsert(
        &state.db,
        &host.id,
        request.duration_minutes,
        price_cents,
        &currency,
    )
    .await?;

    Ok(Json(option.into()))
}

/// Remove one pricing option
async fn delete_pricing(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !PricingRepository::delete(&state.db, &host.id, &id).await? {
        return Err(AppError::NotFound("Pricing option not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
