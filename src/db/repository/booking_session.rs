use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{
    BookingSession, CreateBookingSession, SESSION_STATUS_ABANDONED, SESSION_STATUS_CONFIRMED,
    SESSION_STATUS_CREATED, SESSION_STATUS_PAID,
};
use crate::error::{AppError, AppResult};

// ============================================================================
// Booking Session Repository
// ============================================================================

/// Repository for ephemeral pre-payment booking sessions.
///
/// Implementation notes:
/// - Claiming a session for checkout uses an atomic single-statement UPDATE
///   (`WHERE status = 'created' AND payment_intent_id IS NULL ... RETURNING`)
///   so a session can be exchanged for a payment intent at most once, even
///   under concurrent checkout requests.
/// - The sweeper expires only `created` sessions; `paid` sessions are left
///   for the payment webhook to settle.
pub struct BookingSessionRepository;

const SESSION_COLUMNS: &str = r#"
    id, host_id, guest_id, selected_date, selected_time, selected_duration,
    screen_sharing, translation, recording, transcription,
    amount_cents, currency, status, payment_intent_id, call_language,
    expires_at, created_at, updated_at
"#;

impl BookingSessionRepository {
    pub async fn create(
        pool: &SqlitePool,
        session: CreateBookingSession,
    ) -> AppResult<BookingSession> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let created = sqlx::query_as::<_, BookingSession>(&format!(
            r#"
            INSERT INTO booking_sessions (
                id, host_id, guest_id, selected_date, selected_time, selected_duration,
                screen_sharing, translation, recording, transcription,
                amount_cents, currency, status, payment_intent_id, call_language,
                expires_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(&session.host_id)
        .bind(&session.guest_id)
        .bind(session.selected_date)
        .bind(&session.selected_time)
        .bind(session.selected_duration)
        .bind(session.screen_sharing)
        .bind(session.translation)
        .bind(session.recording)
        .bind(session.transcription)
        .bind(session.amount_cents)
        .bind(&session.currency)
        .bind(SESSION_STATUS_CREATED)
        .bind(&session.call_language)
        .bind(session.expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<BookingSession>> {
        let session = sqlx::query_as::<_, BookingSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM booking_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(session)
    }

    pub async fn find_by_payment_intent(
        pool: &SqlitePool,
        payment_intent_id: &str,
    ) -> AppResult<Option<BookingSession>> {
        let session = sqlx::query_as::<_, BookingSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM booking_sessions WHERE payment_intent_id = ?"
        ))
        .bind(payment_intent_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(session)
    }

    /// Atomically attach a payment intent to a `created` session, moving it to
    /// `paid`. Returns None when the session was already claimed, expired or
    /// does not exist; callers treat that as "not exchangeable".
    pub async fn claim_for_payment(
        pool: &SqlitePool,
        id: &str,
        payment_intent_id: &str,
    ) -> AppResult<Option<BookingSession>> {
        let now = Utc::now().naive_utc();

        let claimed = sqlx::query_as::<_, BookingSession>(&format!(
            r#"
            UPDATE booking_sessions
            SET status = ?, payment_intent_id = ?, updated_at = ?
            WHERE id = ? AND status = ? AND payment_intent_id IS NULL
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(SESSION_STATUS_PAID)
        .bind(payment_intent_id)
        .bind(now)
        .bind(id)
        .bind(SESSION_STATUS_CREATED)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(claimed)
    }

    /// Release a claim after a failed payment so the guest can retry.
    pub async fn release_claim(pool: &SqlitePool, payment_intent_id: &str) -> AppResult<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE booking_sessions
            SET status = ?, payment_intent_id = NULL, updated_at = ?
            WHERE payment_intent_id = ? AND status = ?
            "#,
        )
        .bind(SESSION_STATUS_CREATED)
        .bind(now)
        .bind(payment_intent_id)
        .bind(SESSION_STATUS_PAID)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Settle a `paid` session once its payment succeeded and the durable
    /// booking exists.
    pub async fn mark_confirmed(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "UPDATE booking_sessions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(SESSION_STATUS_CONFIRMED)
        .bind(now)
        .bind(id)
        .bind(SESSION_STATUS_PAID)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Expire stale `created` sessions. Returns how many were abandoned.
    pub async fn sweep_expired(pool: &SqlitePool, now: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE booking_sessions
            SET status = ?, updated_at = ?
            WHERE status = ? AND expires_at <= ?
            "#,
        )
        .bind(SESSION_STATUS_ABANDONED)
        .bind(now)
        .bind(SESSION_STATUS_CREATED)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use super::*;
    use crate::db::UserRepository;

    // A single connection keeps every query on the same in-memory database.
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

    async fn seed_session(pool: &SqlitePool, ttl_minutes: i64) -> BookingSession {
        let host = UserRepository::upsert_by_supabase_id(pool, "sb-host", "host@example.com", "Host", None)
            .await
            .unwrap();
        let guest =
            UserRepository::upsert_by_supabase_id(pool, "sb-guest", "guest@example.com", "Guest", None)
                .await
                .unwrap();

        BookingSessionRepository::create(
            pool,
            CreateBookingSession {
                host_id: host.id,
                guest_id: guest.id,
                selected_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                selected_time: "09:30".to_string(),
                selected_duration: 60,
                screen_sharing: true,
                translation: false,
                recording: false,
                transcription: false,
                amount_cents: 10_000,
                currency: "eur".to_string(),
                call_language: Some("es".to_string()),
                expires_at: Utc::now().naive_utc() + Duration::minutes(ttl_minutes),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn claim_is_at_most_once() {
        let pool = test_pool().await;
        let session = seed_session(&pool, 30).await;

        let first = BookingSessionRepository::claim_for_payment(&pool, &session.id, "pi_1")
            .await
            .unwrap();
        assert!(first.is_some());
        assert_eq!(first.unwrap().status, SESSION_STATUS_PAID);

        // A second exchange must never succeed, regardless of intent id.
        let second = BookingSessionRepository::claim_for_payment(&pool, &session.id, "pi_2")
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = BookingSessionRepository::find_by_id(&pool, &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn released_claim_can_be_claimed_again() {
        let pool = test_pool().await;
        let session = seed_session(&pool, 30).await;

        BookingSessionRepository::claim_for_payment(&pool, &session.id, "pi_1")
            .await
            .unwrap()
            .expect("first claim");

        assert!(BookingSessionRepository::release_claim(&pool, "pi_1")
            .await
            .unwrap());

        let again = BookingSessionRepository::claim_for_payment(&pool, &session.id, "pi_2")
            .await
            .unwrap();
        assert_eq!(again.unwrap().payment_intent_id.as_deref(), Some("pi_2"));
    }

    #[tokio::test]
    async fn sweep_abandons_only_expired_created_sessions() {
        let pool = test_pool().await;
        let expired = seed_session(&pool, -5).await;
        let live = seed_session(&pool, 30).await;

        // A paid session past its TTL must not be swept.
        let claimed = seed_session(&pool, -5).await;
        BookingSessionRepository::claim_for_payment(&pool, &claimed.id, "pi_paid")
            .await
            .unwrap()
            .expect("claim");

        let swept = BookingSessionRepository::sweep_expired(&pool, Utc::now().naive_utc())
            .await
            .unwrap();
        assert_eq!(swept, 1);

        let expired = BookingSessionRepository::find_by_id(&pool, &expired.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(expired.status, SESSION_STATUS_ABANDONED);

        let live = BookingSessionRepository::find_by_id(&pool, &live.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.status, SESSION_STATUS_CREATED);

        let claimed = BookingSessionRepository::find_by_id(&pool, &claimed.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.status, SESSION_STATUS_PAID);
    }

    #[tokio::test]
    async fn mark_confirmed_settles_paid_session() {
        let pool = test_pool().await;
        let session = seed_session(&pool, 30).await;

        BookingSessionRepository::claim_for_payment(&pool, &session.id, "pi_1")
            .await
            .unwrap()
            .expect("claim");
        BookingSessionRepository::mark_confirmed(&pool, &session.id)
            .await
            .unwrap();

        let stored = BookingSessionRepository::find_by_id(&pool, &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SESSION_STATUS_CONFIRMED);
    }
}
