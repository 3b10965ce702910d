use std::sync::Arc;

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::db::UserRepository;
use crate::error::AppResult;
use crate::AppState;

/// Claims of a Supabase access token. Supabase signs these with the
/// project's HS256 JWT secret; `sub` is the auth user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

pub struct AuthService;

impl AuthService {
    /// Decode and validate a Supabase access token.
    pub fn decode_token(state: &Arc<AppState>, token: &str) -> AppResult<SupabaseClaims> {
        let mut validation = Validation::default();
        validation.set_audience(&["authenticated"]);

        let token_data = decode::<SupabaseClaims>(
            token,
            &DecodingKey::from_secret(state.config.supabase.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Failed to decode Supabase token: {:?}", e);
            e
        })?;

        Ok(token_data.claims)
    }

    /// Resolve a bearer token to the local user row, creating it on first
    /// sight of a Supabase identity.
    pub async fn user_from_token(state: &Arc<AppState>, token: &str) -> AppResult<User> {
        let claims = Self::decode_token(state, token)?;

        let email = claims.email.unwrap_or_default();
        let display_name = claims
            .user_metadata
            .full_name
            .or(claims.user_metadata.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or("user").to_string());

        UserRepository::upsert_by_supabase_id(
            &state.db,
            &claims.sub,
            &email,
            &display_name,
            claims.user_metadata.avatar_url.as_deref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    #[test]
    fn display_name_falls_back_to_email_prefix() {
        // Mirrors the fallback chain in user_from_token without a database.
        let metadata = UserMetadata {
            full_name: None,
            name: Some("  ".to_string()),
            avatar_url: None,
        };
        let email = "ana@example.com".to_string();
        let display_name = metadata
            .full_name
            .or(metadata.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or("user").to_string());
        assert_eq!(display_name, "ana");
    }

    #[test]
    fn token_round_trips_through_validation() {
        let claims = SupabaseClaims {
            sub: "user-1".to_string(),
            email: Some("ana@example.com".to_string()),
            aud: "authenticated".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            user_metadata: UserMetadata::default(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let mut validation = Validation::default();
        validation.set_audience(&["authenticated"]);
        let decoded = decode::<SupabaseClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "user-1");
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let claims = SupabaseClaims {
            sub: "user-1".to_string(),
            email: None,
            aud: "anon".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            user_metadata: UserMetadata::default(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let mut validation = Validation::default();
        validation.set_audience(&["authenticated"]);
        assert!(decode::<SupabaseClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .is_err());
    }
}
