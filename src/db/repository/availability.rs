use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateHostAvailability, HostAvailability};
use crate::error::{AppError, AppResult};

// ============================================================================
// Availability Repository
// ============================================================================

const AVAILABILITY_COLUMNS: &str =
    "id, host_id, day_of_week, date, start_time, end_time, created_at, updated_at";

pub struct AvailabilityRepository;

impl AvailabilityRepository {
    pub async fn list_for_host(
        pool: &SqlitePool,
        host_id: &str,
    ) -> AppResult<Vec<HostAvailability>> {
        let records = sqlx::query_as::<_, HostAvailability>(&format!(
            r#"
            SELECT {AVAILABILITY_COLUMNS} FROM host_availability
            WHERE host_id = ?
            ORDER BY date ASC, day_of_week ASC, start_time ASC
            "#
        ))
        .bind(host_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(records)
    }

    pub async fn create(
        pool: &SqlitePool,
        host_id: &str,
        record: CreateHostAvailability,
    ) -> AppResult<HostAvailability> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let created = sqlx::query_as::<_, HostAvailability>(&format!(
            r#"
            INSERT INTO host_availability (
                id, host_id, day_of_week, date, start_time, end_time, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {AVAILABILITY_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(host_id)
        .bind(record.day_of_week)
        .bind(record.date)
        .bind(&record.start_time)
        .bind(&record.end_time)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(created)
    }

    /// Delete one availability record. Scoped to the owning host so a host
    /// can never remove another host's windows.
    pub async fn delete(pool: &SqlitePool, host_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM host_availability WHERE id = ? AND host_id = ?")
            .bind(id)
            .bind(host_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
