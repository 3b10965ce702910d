use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SESSION_STATUS_CREATED: &str = "created";
pub const SESSION_STATUS_PAID: &str = "paid";
pub const SESSION_STATUS_CONFIRMED: &str = "confirmed";
pub const SESSION_STATUS_ABANDONED: &str = "abandoned";

/// Ephemeral pre-payment record of a guest's selections.
///
/// Lifecycle: `created` -> `paid` (payment intent attached, at most once)
/// -> `confirmed` (payment webhook) or `abandoned` (sweeper, TTL elapsed).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingSession {
    pub id: String,
    pub host_id: String,
    pub guest_id: String,
    pub selected_date: NaiveDate,
    pub selected_time: String,
    pub selected_duration: i64,

    pub screen_sharing: bool,
    pub translation: bool,
    pub recording: bool,
    pub transcription: bool,

    // Priced total, frozen at creation
    pub amount_cents: i64,
    pub currency: String,

    pub status: String,
    pub payment_intent_id: Option<String>,
    pub call_language: Option<String>,

    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateBookingSession {
    pub host_id: String,
    pub guest_id: String,
    pub selected_date: NaiveDate,
    pub selected_time: String,
    pub selected_duration: i64,
    pub screen_sharing: bool,
    pub translation: bool,
    pub recording: bool,
    pub transcription: bool,
    pub amount_cents: i64,
    pub currency: String,
    pub call_language: Option<String>,
    pub expires_at: NaiveDateTime,
}
