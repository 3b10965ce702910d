use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub supabase_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub lang: Option<String>,

    pub is_host: bool,
    pub is_admin: bool,

    // Host profile fields, empty for plain guests
    pub host_title: Option<String>,
    pub host_bio: Option<String>,

    // Add-on services the host offers; gate the matching surcharges
    pub screen_sharing_enabled: bool,
    pub translation_enabled: bool,
    pub recording_enabled: bool,
    pub transcription_enabled: bool,

    // Stripe Connect account id once onboarding has started
    pub stripe_account_id: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
