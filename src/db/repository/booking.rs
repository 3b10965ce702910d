use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{
    Booking, BOOKING_STATUS_CANCELLED, BOOKING_STATUS_COMPLETED, BOOKING_STATUS_CONFIRMED,
};
use crate::error::{AppError, AppResult};

// ============================================================================
// Booking Repository
// ============================================================================

const BOOKING_COLUMNS: &str = r#"
    id, host_id, guest_id, scheduled_date, start_time, duration_minutes,
    price_cents, currency, status, call_language, payment_intent_id, agora_channel,
    created_at, updated_at
"#;

pub struct BookingRepository;

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub host_id: String,
    pub guest_id: String,
    pub scheduled_date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub currency: String,
    pub call_language: Option<String>,
    pub payment_intent_id: String,
}

impl BookingRepository {
    /// Create a confirmed booking from a settled payment.
    ///
    /// The partial unique index on (host_id, scheduled_date, start_time) over
    /// non-cancelled rows is the last line of defense against double booking;
    /// a violation surfaces as Conflict.
    pub async fn create_confirmed(
        pool: &SqlitePool,
        booking: CreateBooking,
    ) -> AppResult<Booking> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let agora_channel = format!("dialoom-{}", id);

        let created = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (
                id, host_id, guest_id, scheduled_date, start_time, duration_minutes,
                price_cents, currency, status, call_language, payment_intent_id, agora_channel,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(&booking.host_id)
        .bind(&booking.guest_id)
        .bind(booking.scheduled_date)
        .bind(&booking.start_time)
        .bind(booking.duration_minutes)
        .bind(booking.price_cents)
        .bind(&booking.currency)
        .bind(BOOKING_STATUS_CONFIRMED)
        .bind(&booking.call_language)
        .bind(&booking.payment_intent_id)
        .bind(&agora_channel)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, "That time slot has already been booked"))?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(booking)
    }

    pub async fn find_by_payment_intent(
        pool: &SqlitePool,
        payment_intent_id: &str,
    ) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_intent_id = ?"
        ))
        .bind(payment_intent_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(booking)
    }

    /// All bookings the user participates in, as guest or host.
    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE host_id = ? OR guest_id = ?
            ORDER BY scheduled_date DESC, start_time DESC
            "#
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(bookings)
    }

    /// Start times already taken for a host on a date (live bookings only).
    pub async fn booked_start_times(
        pool: &SqlitePool,
        host_id: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT start_time FROM bookings
            WHERE host_id = ? AND scheduled_date = ? AND status != ?
            "#,
        )
        .bind(host_id)
        .bind(date)
        .bind(BOOKING_STATUS_CANCELLED)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Call finished; no-op when the booking is already completed.
    pub async fn mark_completed(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let result =
            sqlx::query("UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(BOOKING_STATUS_COMPLETED)
                .bind(now)
                .bind(id)
                .bind(BOOKING_STATUS_CONFIRMED)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Cancel a confirmed booking; completed bookings stay completed.
    pub async fn mark_cancelled(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let result =
            sqlx::query("UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(BOOKING_STATUS_CANCELLED)
                .bind(now)
                .bind(id)
                .bind(BOOKING_STATUS_CONFIRMED)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(e)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use super::*;
    use crate::db::UserRepository;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory sqlite");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");
        pool
    }

    fn booking_for(host_id: &str, guest_id: &str, intent: &str) -> CreateBooking {
        CreateBooking {
            host_id: host_id.to_string(),
            guest_id: guest_id.to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            start_time: "09:30".to_string(),
            duration_minutes: 60,
            price_cents: 10_000,
            currency: "eur".to_string(),
            call_language: Some("es".to_string()),
            payment_intent_id: intent.to_string(),
        }
    }

    #[tokio::test]
    async fn same_slot_cannot_be_booked_twice() {
        let pool = test_pool().await;
        let host = UserRepository::upsert_by_supabase_id(&pool, "sb-h", "h@example.com", "H", None)
            .await
            .unwrap();
        let guest = UserRepository::upsert_by_supabase_id(&pool, "sb-g", "g@example.com", "G", None)
            .await
            .unwrap();

        BookingRepository::create_confirmed(&pool, booking_for(&host.id, &guest.id, "pi_1"))
            .await
            .expect("first booking");

        let err = BookingRepository::create_confirmed(&pool, booking_for(&host.id, &guest.id, "pi_2"))
            .await
            .expect_err("second booking for the same slot must fail");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancelled_slot_frees_up() {
        let pool = test_pool().await;
        let host = UserRepository::upsert_by_supabase_id(&pool, "sb-h", "h@example.com", "H", None)
            .await
            .unwrap();
        let guest = UserRepository::upsert_by_supabase_id(&pool, "sb-g", "g@example.com", "G", None)
            .await
            .unwrap();

        let first =
            BookingRepository::create_confirmed(&pool, booking_for(&host.id, &guest.id, "pi_1"))
                .await
                .unwrap();
        assert!(BookingRepository::mark_cancelled(&pool, &first.id)
            .await
            .unwrap());

        BookingRepository::create_confirmed(&pool, booking_for(&host.id, &guest.id, "pi_2"))
            .await
            .expect("slot is free again after cancellation");
    }

    #[tokio::test]
    async fn completed_booking_cannot_be_cancelled() {
        let pool = test_pool().await;
        let host = UserRepository::upsert_by_supabase_id(&pool, "sb-h", "h@example.com", "H", None)
            .await
            .unwrap();
        let guest = UserRepository::upsert_by_supabase_id(&pool, "sb-g", "g@example.com", "G", None)
            .await
            .unwrap();

        let booking =
            BookingRepository::create_confirmed(&pool, booking_for(&host.id, &guest.id, "pi_1"))
                .await
                .unwrap();

        assert!(BookingRepository::mark_completed(&pool, &booking.id)
            .await
            .unwrap());
        // Second completion is a no-op.
        assert!(!BookingRepository::mark_completed(&pool, &booking.id)
            .await
            .unwrap());
        assert!(!BookingRepository::mark_cancelled(&pool, &booking.id)
            .await
            .unwrap());
    }
}
