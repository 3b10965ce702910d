use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};

use crate::error::AppError;
use crate::services::booking::BookingService;
use crate::services::stripe::{StripeService, WebhookEvent};
use crate::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
const EVENT_PAYMENT_FAILED: &str = "payment_intent.payment_failed";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

async fn handle_stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, String), AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    state.stripe.verify_webhook_signature(signature, &body)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid payload: {}", e)))?;

    tracing::info!(
        "Received Stripe webhook: event_id={}, event_type={}",
        event.id,
        event.event_type
    );

    // Stripe retries deliveries; acknowledge replays without side effects.
    if !StripeService::mark_event_processed(&event.id).await {
        tracing::info!("Stripe event {} already processed, ignoring replay", event.id);
        return Ok((StatusCode::OK, "OK".to_string()));
    }

    match event.event_type.as_str() {
        EVENT_PAYMENT_SUCCEEDED => {
            let intent_id = extract_intent_id(&event)?;
            BookingService::confirm_payment(&state, &intent_id).await?;
            Ok((StatusCode::OK, "OK".to_string()))
        }
        EVENT_PAYMENT_FAILED => {
            let intent_id = extract_intent_id(&event)?;
            BookingService::payment_failed(&state, &intent_id).await?;
            Ok((StatusCode::OK, "OK".to_string()))
        }
        _ => {
            tracing::debug!("Unhandled Stripe event type: {}", event.event_type);
            Ok((StatusCode::OK, "OK".to_string()))
        }
    }
}

fn extract_intent_id(event: &WebhookEvent) -> Result<String, AppError> {
    event
        .data
        .object
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("Event object has no payment intent id".to_string()))
}
