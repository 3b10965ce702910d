use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bookable duration and its base price for one host.
///
/// `duration_minutes = 0` denotes a free introductory consultation and must
/// carry `price_cents = 0`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PricingOption {
    pub id: String,
    pub host_id: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
