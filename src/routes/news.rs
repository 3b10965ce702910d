use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::NewsArticle;
use crate::db::NewsRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthAdmin;
use crate::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_news).post(create_news))
        // GET resolves by slug; PUT/DELETE take the article id in the same position
        .route(
            "/:slug",
            get(get_news).put(update_news).delete(delete_news),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<NewsArticle> for ArticleResponse {
    fn from(article: NewsArticle) -> Self {
        ArticleResponse {
            id: article.id,
            slug: article.slug,
            title: article.title,
            body: article.body,
            cover_image_url: article.cover_image_url,
            published: article.published,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    pub title: String,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub published: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Published articles, newest first
async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ArticleResponse>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 200);
    let articles = NewsRepository::list_published(&state.db, limit).await?;
    Ok(Json(articles.into_iter().map(Into::into).collect()))
}

/// One published article by slug
async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Json<ArticleResponse>> {
    let article = NewsRepository::find_by_slug(&state.db, &slug)
        .await?
        .filter(|a| a.published)
        .ok_or_else(|| AppError::NotFound("Article not found".to_string()))?;

    Ok(Json(article.into()))
}

/// Create an article (admin only)
async fn create_news(
    State(state): State<Arc<AppState>>,
    AuthAdmin(admin): AuthAdmin,
    Json(request): Json<CreateArticleRequest>,
) -> AppResult<Json<ArticleResponse>> {
    let slug = request.slug.trim().to_lowercase();
    if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation(
            "slug must be non-empty and use only letters, digits and dashes".to_string(),
        ));
    }
    if NewsRepository::find_by_slug(&state.db, &slug).await?.is_some() {
        return Err(AppError::Conflict("An article with that slug exists".to_string()));
    }

    let article = NewsRepository::create(
        &state.db,
        &admin.id,
        &slug,
        request.title.trim(),
        &request.body,
        request.cover_image_url.as_deref(),
        request.published.unwrap_or(false),
    )
    .await?;

    Ok(Json(article.into()))
}

/// Update an article (admin only)
async fn update_news(
    State(state): State<Arc<AppState>>,
    AuthAdmin(_admin): AuthAdmin,
    Path(id): Path<String>,
    Json(request): Json<UpdateArticleRequest>,
) -> AppResult<Json<ArticleResponse>> {
    if NewsRepository::find_by_id(&state.db, &id).await?.is_none() {
        return Err(AppError::NotFound("Article not found".to_string()));
    }

    let article = NewsRepository::update(
        &state.db,
        &id,
        request.title.trim(),
        &request.body,
        request.cover_image_url.as_deref(),
        request.published,
    )
    .await?;

    Ok(Json(article.into()))
}

/// Delete an article (admin only)
async fn delete_news(
    State(state): State<Arc<AppState>>,
    AuthAdmin(_admin): AuthAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !NewsRepository::delete(&state.db, &id).await? {
        return Err(AppError::NotFound("Article not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
