use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::UserRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::{AuthHost, AuthUser};
use crate::services::booking::BookingService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/connect/account", post(create_connect_account))
        .route("/connect/onboarding-link", post(create_onboarding_link))
        .route("/connect/status", get(connect_status))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub booking_session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    /// None for free consultations, which confirm without a charge.
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAccountResponse {
    pub account_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingLinkResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectStatusResponse {
    pub onboarded: bool,
    pub charges_enabled: bool,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Exchange a booking session for a payment intent (at most once)
async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> AppResult<Json<CreatePaymentIntentResponse>> {
    let result = BookingService::checkout(&state, &user, &request.booking_session_id).await?;

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: result.client_secret,
        status: result.session.status,
    }))
}

/// Create the host's Stripe Express account
async fn create_connect_account(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
) -> AppResult<Json<ConnectAccountResponse>> {
    if let Some(existing) = host.stripe_account_id {
        return Ok(Json(ConnectAccountResponse {
            account_id: existing,
        }));
    }

    let account = state.stripe.create_connect_account(&host.email).await?;
    UserRepository::set_stripe_account(&state.db, &host.id, &account.id).await?;

    tracing::info!("Created Stripe Connect account {} for host {}", account.id, host.id);

    Ok(Json(ConnectAccountResponse {
        account_id: account.id,
    }))
}

/// Hosted onboarding link for the host's Express account
async fn create_onboarding_link(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
) -> AppResult<Json<OnboardingLinkResponse>> {
    let account_id = host.stripe_account_id.ok_or_else(|| {
        AppError::BadRequest("Create a Stripe account before requesting onboarding".to_string())
    })?;

    let frontend = &state.config.server.frontend_url;
    let link = state
        .stripe
        .create_account_link(
            &account_id,
            &format!("{}/dashboard/payouts?stripe=refresh", frontend),
            &format!("{}/dashboard/payouts?stripe=return", frontend),
        )
        .await?;

    Ok(Json(OnboardingLinkResponse { url: link.url }))
}

/// Whether the host can accept charges and payouts yet
async fn connect_status(
    State(state): State<Arc<AppState>>,
    AuthHost(host): AuthHost,
) -> AppResult<Json<ConnectStatusResponse>> {
    let Some(account_id) = host.stripe_account_id else {
        return Ok(Json(ConnectStatusResponse {
            onboarded: false,
            charges_enabled: false,
            details_submitted: false,
            payouts_enabled: false,
        }));
    };

    let account = state.stripe.get_account(&account_id).await?;

    Ok(Json(ConnectStatusResponse {
        onboarded: true,
        charges_enabled: account.charges_enabled,
        details_submitted: account.details_submitted,
        payouts_enabled: account.payouts_enabled,
    }))
}
