use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::db::UserRepository;
use crate::error::{AppError, AppResult};
use crate::services::auth::AuthService;
use crate::services::pricing::ServiceSelection;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me).put(update_me))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub lang: Option<String>,
    pub is_host: bool,
    pub is_admin: bool,
    pub host_title: Option<String>,
    pub host_bio: Option<String>,
    pub services: ServiceSelection,
    pub stripe_onboarded: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            lang: user.lang,
            is_host: user.is_host,
            is_admin: user.is_admin,
            host_title: user.host_title,
            host_bio: user.host_bio,
            services: ServiceSelection {
                screen_sharing: user.screen_sharing_enabled,
                translation: user.translation_enabled,
                recording: user.recording_enabled,
                transcription: user.transcription_enabled,
            },
            stripe_onboarded: user.stripe_account_id.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub lang: Option<String>,
    pub host_title: Option<String>,
    pub host_bio: Option<String>,
    /// Upgrade the account to a host profile.
    pub become_host: Option<bool>,
    /// Replace the add-on service flags (hosts only).
    pub services: Option<ServiceSelection>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Current user profile
async fn me(State(_state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Update the current user's profile (and host fields when applicable)
async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateMeRequest>,
) -> AppResult<Json<UserResponse>> {
    if request.become_host == Some(true) && !user.is_host {
        UserRepository::set_host(&state.db, &user.id).await?;
    }

    let display_name = request
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&user.display_name);

    let mut updated = UserRepository::update_profile(
        &state.db,
        &user.id,
        display_name,
        request.avatar_url.as_deref().or(user.avatar_url.as_deref()),
        request.lang.as_deref().or(user.lang.as_deref()),
        request.host_title.as_deref().or(user.host_title.as_deref()),
        request.host_bio.as_deref().or(user.host_bio.as_deref()),
    )
    .await?;

    if let Some(services) = request.services {
        if !updated.is_host {
            return Err(AppError::Validation(
                "Only hosts can configure add-on services".to_string(),
            ));
        }
        updated = UserRepository::update_service_flags(
            &state.db,
            &user.id,
            services.screen_sharing,
            services.translation,
            services.recording,
            services.transcription,
        )
        .await?;
    }

    Ok(Json(updated.into()))
}

// ============================================================================
// Auth Middleware / Extractor
// ============================================================================

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Extractor for authenticated user
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Extract Authorization header (Bearer token)
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
            tracing::debug!("Authorization header doesn't start with 'Bearer '");
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            tracing::debug!("Empty bearer token in Authorization header");
            return Err(AppError::Unauthorized);
        }

        let user = AuthService::user_from_token(state, token).await.map_err(|e| {
            tracing::debug!("Failed to resolve user from token: {:?}", e);
            e
        })?;

        Ok(AuthUser(user))
    }
}

/// Extractor for authenticated hosts
pub struct AuthHost(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthHost {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_host {
            return Err(AppError::Forbidden);
        }
        Ok(AuthHost(user))
    }
}

/// Extractor for administrators
pub struct AuthAdmin(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AuthAdmin(user))
    }
}
