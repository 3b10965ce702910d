use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::NewsArticle;
use crate::error::{AppError, AppResult};

// ============================================================================
// News Repository
// ============================================================================

const NEWS_COLUMNS: &str =
    "id, slug, title, body, cover_image_url, published, author_id, created_at, updated_at";

pub struct NewsRepository;

impl NewsRepository {
    pub async fn list_published(pool: &SqlitePool, limit: i64) -> AppResult<Vec<NewsArticle>> {
        let articles = sqlx::query_as::<_, NewsArticle>(&format!(
            r#"
            SELECT {NEWS_COLUMNS} FROM news_articles
            WHERE published = 1
            ORDER BY created_at DESC
            LIMIT ?
            "#
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(articles)
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> AppResult<Option<NewsArticle>> {
        let article = sqlx::query_as::<_, NewsArticle>(&format!(
            "SELECT {NEWS_COLUMNS} FROM news_articles WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(article)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<NewsArticle>> {
        let article = sqlx::query_as::<_, NewsArticle>(&format!(
            "SELECT {NEWS_COLUMNS} FROM news_articles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(article)
    }

    pub async fn create(
        pool: &SqlitePool,
        author_id: &str,
        slug: &str,
        title: &str,
        body: &str,
        cover_image_url: Option<&str>,
        published: bool,
    ) -> AppResult<NewsArticle> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let article = sqlx::query_as::<_, NewsArticle>(&format!(
            r#"
            INSERT INTO news_articles (
                id, slug, title, body, cover_image_url, published, author_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {NEWS_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(slug)
        .bind(title)
        .bind(body)
        .bind(cover_image_url)
        .bind(published)
        .bind(author_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(article)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        title: &str,
        body: &str,
        cover_image_url: Option<&str>,
        published: bool,
    ) -> AppResult<NewsArticle> {
        let now = Utc::now().naive_utc();

        let article = sqlx::query_as::<_, NewsArticle>(&format!(
            r#"
            UPDATE news_articles
            SET title = ?, body = ?, cover_image_url = ?, published = ?, updated_at = ?
            WHERE id = ?
            RETURNING {NEWS_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(body)
        .bind(cover_image_url)
        .bind(published)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(article)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM news_articles WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
