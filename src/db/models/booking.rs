use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const BOOKING_STATUS_CONFIRMED: &str = "confirmed";
pub const BOOKING_STATUS_COMPLETED: &str = "completed";
pub const BOOKING_STATUS_CANCELLED: &str = "cancelled";

/// Durable booking, created once a payment succeeds.
///
/// Status transitions are externally driven: payment webhook -> `confirmed`,
/// call end -> `completed`, guest/host action -> `cancelled`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub host_id: String,
    pub guest_id: String,
    pub scheduled_date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub currency: String,
    pub status: String,
    pub call_language: Option<String>,
    pub payment_intent_id: Option<String>,
    pub agora_channel: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
