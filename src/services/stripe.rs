use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

/// Webhook events older than this are rejected outright.
const SIGNATURE_TOLERANCE_MINUTES: i64 = 5;

/// How long processed webhook event ids are remembered for replay suppression.
const EVENT_CACHE_RETENTION_HOURS: i64 = 24;

lazy_static::lazy_static! {
    // Webhook event ids we have already acted on. Stripe retries deliveries,
    // so a replayed event must be acknowledged without side effects.
    static ref PROCESSED_EVENTS: RwLock<HashMap<String, DateTime<Utc>>> = RwLock::new(HashMap::new());
}

#[derive(Debug, Clone)]
pub struct StripeService {
    client: Client,
    secret_key: String,
    webhook_secret: String,
    commission_percent: u32,
}

// ============================================================================
// Stripe API Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectAccount {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

// ============================================================================
// Service
// ============================================================================

impl StripeService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.stripe.secret_key.clone(),
            webhook_secret: config.stripe.webhook_secret.clone(),
            commission_percent: config.stripe.commission_percent,
        }
    }

    /// Platform commission for a charge amount, rounded down to whole cents.
    pub fn application_fee_cents(&self, amount_cents: i64) -> i64 {
        amount_cents * i64::from(self.commission_percent) / 100
    }

    /// Create a payment intent for a booking session. When the host has a
    /// Connect account the charge is split: the platform keeps its commission
    /// and the rest transfers to the host.
    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        booking_session_id: &str,
        destination_account: Option<&str>,
    ) -> AppResult<PaymentIntent> {
        let amount = amount_cents.to_string();
        let mut form: Vec<(&str, String)> = vec![
            ("amount", amount),
            ("currency", currency.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            (
                "metadata[booking_session_id]",
                booking_session_id.to_string(),
            ),
        ];

        if let Some(account) = destination_account {
            form.push((
                "application_fee_amount",
                self.application_fee_cents(amount_cents).to_string(),
            ));
            form.push(("transfer_data[destination]", account.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/payment_intents", STRIPE_API_URL))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Best-effort cancellation of an intent whose session claim was lost.
    pub async fn cancel_payment_intent(&self, payment_intent_id: &str) -> AppResult<()> {
        let response = self
            .client
            .post(format!(
                "{}/payment_intents/{}/cancel",
                STRIPE_API_URL, payment_intent_id
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let _: PaymentIntent = Self::decode(response).await?;
        Ok(())
    }

    /// Create an Express account for a host.
    pub async fn create_connect_account(&self, email: &str) -> AppResult<ConnectAccount> {
        let form = [("type", "express"), ("email", email)];

        let response = self
            .client
            .post(format!("{}/accounts", STRIPE_API_URL))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Hosted onboarding link for an Express account.
    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> AppResult<AccountLink> {
        let form = [
            ("account", account_id),
            ("refresh_url", refresh_url),
            ("return_url", return_url),
            ("type", "account_onboarding"),
        ];

        let response = self
            .client
            .post(format!("{}/account_links", STRIPE_API_URL))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        Self::decode(response).await
    }

    pub async fn get_account(&self, account_id: &str) -> AppResult<ConnectAccount> {
        let response = self
            .client
            .get(format!("{}/accounts/{}", STRIPE_API_URL, account_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status = response.status();
        let message = match response.json::<StripeErrorResponse>().await {
            Ok(err) => {
                let kind = err.error.error_type.unwrap_or_else(|| "api_error".to_string());
                let msg = err
                    .error
                    .message
                    .unwrap_or_else(|| "Stripe request failed".to_string());
                format!("{} ({})", msg, kind)
            }
            Err(_) => format!("Stripe request failed with status {}", status),
        };

        Err(AppError::Stripe(message))
    }

    /// Verify a `Stripe-Signature` header against the raw request body.
    ///
    /// Header format: `t=<unix>,v1=<hex>[,v1=<hex>...]`; the signed payload is
    /// `"{t}.{body}"`. Any matching v1 signature passes; stale timestamps are
    /// rejected.
    pub fn verify_webhook_signature(&self, signature_header: &str, body: &[u8]) -> AppResult<()> {
        verify_signature_with_secret(&self.webhook_secret, signature_header, body, Utc::now())
    }

    /// Record an event id as processed. Returns false when the event was seen
    /// before (replay), true when it is fresh.
    pub async fn mark_event_processed(event_id: &str) -> bool {
        let now = Utc::now();
        let mut cache = PROCESSED_EVENTS.write().await;

        cache.retain(|_, seen| now.signed_duration_since(*seen).num_hours() < EVENT_CACHE_RETENTION_HOURS);

        cache.insert(event_id.to_string(), now).is_none()
    }
}

fn verify_signature_with_secret(
    secret: &str,
    signature_header: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> AppResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::BadRequest("Invalid signature header".to_string()))?;
    if candidates.is_empty() {
        return Err(AppError::BadRequest("Invalid signature header".to_string()));
    }

    let signed_at = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| AppError::BadRequest("Invalid signature timestamp".to_string()))?;
    if now.signed_duration_since(signed_at).num_minutes().abs() > SIGNATURE_TOLERANCE_MINUTES {
        return Err(AppError::BadRequest("Webhook event too old".to_string()));
    }

    for candidate in candidates {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to create HMAC")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);

        if mac.verify_slice(&candidate).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let now = Utc::now();
        let body = br#"{"id":"evt_1"}"#;
        let header = format!("t={},v1={}", now.timestamp(), sign("whsec_x", now.timestamp(), body));

        assert!(verify_signature_with_secret("whsec_x", &header, body, now).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1_candidate() {
        let now = Utc::now();
        let body = br#"{"id":"evt_1"}"#;
        let good = sign("whsec_x", now.timestamp(), body);
        let header = format!("t={},v1={},v1={}", now.timestamp(), "00ff".repeat(16), good);

        assert!(verify_signature_with_secret("whsec_x", &header, body, now).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = Utc::now();
        let body = br#"{"id":"evt_1"}"#;
        let header = format!(
            "t={},v1={}",
            now.timestamp(),
            sign("whsec_other", now.timestamp(), body)
        );

        let err = verify_signature_with_secret("whsec_x", &header, body, now).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let now = Utc::now();
        let signed_at = now - Duration::minutes(SIGNATURE_TOLERANCE_MINUTES + 1);
        let body = br#"{"id":"evt_1"}"#;
        let header = format!(
            "t={},v1={}",
            signed_at.timestamp(),
            sign("whsec_x", signed_at.timestamp(), body)
        );

        let err = verify_signature_with_secret("whsec_x", &header, body, now).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn rejects_header_without_signature() {
        let now = Utc::now();
        let err = verify_signature_with_secret("whsec_x", "t=123", b"{}", now).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = verify_signature_with_secret("whsec_x", "v1=abcd", b"{}", now).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn replayed_event_ids_are_suppressed() {
        assert!(StripeService::mark_event_processed("evt_replay_test").await);
        assert!(!StripeService::mark_event_processed("evt_replay_test").await);
    }

    #[test]
    fn commission_is_percent_of_amount() {
        let service = StripeService {
            client: Client::new(),
            secret_key: "sk_test".to_string(),
            webhook_secret: "whsec".to_string(),
            commission_percent: 10,
        };
        assert_eq!(service.application_fee_cents(10_500), 1_050);
        assert_eq!(service.application_fee_cents(99), 9);
    }
}
