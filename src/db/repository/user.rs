use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::User;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

const USER_COLUMNS: &str = r#"
    id, supabase_id, email, display_name, avatar_url, lang,
    is_host, is_admin, host_title, host_bio,
    screen_sharing_enabled, translation_enabled, recording_enabled, transcription_enabled,
    stripe_account_id,
    created_at, updated_at
"#;

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user)
    }

    pub async fn find_by_supabase_id(
        pool: &SqlitePool,
        supabase_id: &str,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE supabase_id = ?"
        ))
        .bind(supabase_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user)
    }

    /// Find or create the local row for a Supabase identity. Email and display
    /// name follow whatever the token currently carries.
    pub async fn upsert_by_supabase_id(
        pool: &SqlitePool,
        supabase_id: &str,
        email: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> AppResult<User> {
        let now = Utc::now().naive_utc();

        if let Some(existing) = Self::find_by_supabase_id(pool, supabase_id).await? {
            let user = sqlx::query_as::<_, User>(&format!(
                r#"
                UPDATE users
                SET email = ?, display_name = ?, avatar_url = COALESCE(?, avatar_url), updated_at = ?
                WHERE id = ?
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(email)
            .bind(display_name)
            .bind(avatar_url)
            .bind(now)
            .bind(&existing.id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)?;

            return Ok(user);
        }

        let id = Uuid::new_v4().to_string();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                id, supabase_id, email, display_name, avatar_url, lang,
                is_host, is_admin, host_title, host_bio,
                screen_sharing_enabled, translation_enabled, recording_enabled, transcription_enabled,
                stripe_account_id,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, NULL, 0, 0, NULL, NULL, 0, 0, 0, 0, NULL, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(supabase_id)
        .bind(email)
        .bind(display_name)
        .bind(avatar_url)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user)
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        user_id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
        lang: Option<&str>,
        host_title: Option<&str>,
        host_bio: Option<&str>,
    ) -> AppResult<User> {
        let now = Utc::now().naive_utc();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET display_name = ?, avatar_url = ?, lang = ?, host_title = ?, host_bio = ?, updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(display_name)
        .bind(avatar_url)
        .bind(lang)
        .bind(host_title)
        .bind(host_bio)
        .bind(now)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user)
    }

    pub async fn set_host(pool: &SqlitePool, user_id: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query("UPDATE users SET is_host = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn update_service_flags(
        pool: &SqlitePool,
        user_id: &str,
        screen_sharing: bool,
        translation: bool,
        recording: bool,
        transcription: bool,
    ) -> AppResult<User> {
        let now = Utc::now().naive_utc();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET screen_sharing_enabled = ?, translation_enabled = ?,
                recording_enabled = ?, transcription_enabled = ?, updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(screen_sharing)
        .bind(translation)
        .bind(recording)
        .bind(transcription)
        .bind(now)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user)
    }

    pub async fn set_stripe_account(
        pool: &SqlitePool,
        user_id: &str,
        stripe_account_id: &str,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query("UPDATE users SET stripe_account_id = ?, updated_at = ? WHERE id = ?")
            .bind(stripe_account_id)
            .bind(now)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    /// Search host profiles by display name or title (case-insensitive).
    /// An empty query lists hosts newest-first.
    pub async fn search_hosts(
        pool: &SqlitePool,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<User>> {
        if query.trim().is_empty() {
            let hosts = sqlx::query_as::<_, User>(&format!(
                r#"
                SELECT {USER_COLUMNS} FROM users
                WHERE is_host = 1
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

            return Ok(hosts);
        }

        let pattern = format!("%{}%", query.to_lowercase());
        let hosts = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE is_host = 1
              AND (LOWER(display_name) LIKE ? OR LOWER(COALESCE(host_title, '')) LIKE ?)
            ORDER BY display_name ASC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(hosts)
    }
}
