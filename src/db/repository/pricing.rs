use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::PricingOption;
use crate::error::{AppError, AppResult};

// ============================================================================
// Pricing Repository
// ============================================================================

const PRICING_COLUMNS: &str =
    "id, host_id, duration_minutes, price_cents, currency, created_at, updated_at";

pub struct PricingRepository;

impl PricingRepository {
    pub async fn list_for_host(pool: &SqlitePool, host_id: &str) -> AppResult<Vec<PricingOption>> {
        let options = sqlx::query_as::<_, PricingOption>(&format!(
            r#"
            SELECT {PRICING_COLUMNS} FROM pricing_options
            WHERE host_id = ?
            ORDER BY duration_minutes ASC
            "#
        ))
        .bind(host_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(options)
    }

    pub async fn find_option(
        pool: &SqlitePool,
        host_id: &str,
        duration_minutes: i64,
    ) -> AppResult<Option<PricingOption>> {
        let option = sqlx::query_as::<_, PricingOption>(&format!(
            r#"
            SELECT {PRICING_COLUMNS} FROM pricing_options
            WHERE host_id = ? AND duration_minutes = ?
            "#
        ))
        .bind(host_id)
        .bind(duration_minutes)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(option)
    }

    /// Insert or update the price for one duration (one row per host+duration).
    pub async fn upsert(
        pool: &SqlitePool,
        host_id: &str,
        duration_minutes: i64,
        price_cents: i64,
        currency: &str,
    ) -> AppResult<PricingOption> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let option = sqlx::query_as::<_, PricingOption>(&format!(
            r#"
            INSERT INTO pricing_options (
                id, host_id, duration_minutes, price_cents, currency, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (host_id, duration_minutes) DO UPDATE
            SET price_cents = excluded.price_cents,
                currency = excluded.currency,
                updated_at = excluded.updated_at
            RETURNING {PRICING_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(host_id)
        .bind(duration_minutes)
        .bind(price_cents)
        .bind(currency)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(option)
    }

    pub async fn delete(pool: &SqlitePool, host_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM pricing_options WHERE id = ? AND host_id = ?")
            .bind(id)
            .bind(host_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
