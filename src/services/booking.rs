use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::models::{BookingSession, CreateBookingSession, User, SESSION_STATUS_CREATED};
use crate::db::repository::booking::CreateBooking;
use crate::db::{BookingRepository, BookingSessionRepository, PricingRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::services::pricing::{compose_total, ServiceSelection};
use crate::services::scheduling::SchedulingService;
use crate::AppState;

/// Orchestration of the booking flow: session creation, checkout exchange,
/// webhook-driven confirmation and cancellation.
pub struct BookingService;

#[derive(Debug, Clone)]
pub struct NewSessionRequest {
    pub host_id: String,
    pub selected_date: NaiveDate,
    pub selected_time: String,
    pub selected_duration: i64,
    pub services: ServiceSelection,
    pub call_language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub session: BookingSession,
    pub client_secret: Option<String>,
}

impl BookingService {
    /// Create an ephemeral booking session from a guest's finalized
    /// selections. The total is priced and frozen here; the slot must be
    /// bookable at this moment (inside availability, not already taken).
    pub async fn create_session(
        state: &Arc<AppState>,
        guest: &User,
        request: NewSessionRequest,
    ) -> AppResult<BookingSession> {
        let host = UserRepository::find_by_id(&state.db, &request.host_id)
            .await?
            .filter(|u| u.is_host)
            .ok_or_else(|| AppError::NotFound("Host not found".to_string()))?;

        if host.id == guest.id {
            return Err(AppError::Validation(
                "You cannot book a session with yourself".to_string(),
            ));
        }

        let option = PricingRepository::find_option(&state.db, &host.id, request.selected_duration)
            .await?
            .ok_or_else(|| {
                AppError::Validation("The host does not offer that duration".to_string())
            })?;

        let slots = SchedulingService::bookable_slots(
            &state.db,
            &host.id,
            request.selected_date,
            state.config.booking.slot_increment_minutes,
        )
        .await?;
        if !slots.contains(&request.selected_time) {
            return Err(AppError::Conflict(crate::i18n::tr(
                guest.lang.as_deref(),
                "validation.slot_taken",
                None,
            )));
        }

        let amount_cents = compose_total(
            option.price_cents,
            &request.services,
            &host,
            &state.config.service_fees,
        );

        let expires_at =
            Utc::now().naive_utc() + Duration::minutes(state.config.booking.session_ttl_minutes);

        BookingSessionRepository::create(
            &state.db,
            CreateBookingSession {
                host_id: host.id,
                guest_id: guest.id.clone(),
                selected_date: request.selected_date,
                selected_time: request.selected_time,
                selected_duration: request.selected_duration,
                screen_sharing: request.services.screen_sharing,
                translation: request.services.translation,
                recording: request.services.recording,
                transcription: request.services.transcription,
                amount_cents,
                currency: option.currency,
                call_language: request.call_language,
                expires_at,
            },
        )
        .await
    }

    /// Exchange a session for a payment intent, at most once.
    ///
    /// The intent is created at Stripe first; attaching it to the session is
    /// the atomic claim. If Stripe fails the session is untouched; if the
    /// claim is lost to a concurrent checkout the fresh intent is cancelled
    /// best-effort.
    pub async fn checkout(
        state: &Arc<AppState>,
        user: &User,
        session_id: &str,
    ) -> AppResult<CheckoutResult> {
        let session = BookingSessionRepository::find_by_id(&state.db, session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking session not found".to_string()))?;

        if session.guest_id != user.id {
            return Err(AppError::Forbidden);
        }
        if session.status != SESSION_STATUS_CREATED || session.payment_intent_id.is_some() {
            return Err(AppError::Conflict(
                "This booking session has already been used".to_string(),
            ));
        }
        if session.expires_at <= Utc::now().naive_utc() {
            return Err(AppError::Conflict(
                "This booking session has expired, start over".to_string(),
            ));
        }

        // Free consultations skip Stripe entirely: claim with a synthetic
        // intent id and confirm immediately.
        if session.amount_cents == 0 {
            let synthetic_id = format!("free_{}", Uuid::new_v4());
            let claimed =
                BookingSessionRepository::claim_for_payment(&state.db, &session.id, &synthetic_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Conflict(
                            "This booking session has already been used".to_string(),
                        )
                    })?;

            Self::confirm_paid_session(state, &claimed).await?;
            let session = BookingSessionRepository::find_by_id(&state.db, &claimed.id)
                .await?
                .unwrap_or(claimed);
            return Ok(CheckoutResult {
                session,
                client_secret: None,
            });
        }

        let host = UserRepository::find_by_id(&state.db, &session.host_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Host not found".to_string()))?;

        let intent = state
            .stripe
            .create_payment_intent(
                session.amount_cents,
                &session.currency,
                &session.id,
                host.stripe_account_id.as_deref(),
            )
            .await?;

        let claimed =
            BookingSessionRepository::claim_for_payment(&state.db, &session.id, &intent.id).await?;

        let Some(claimed) = claimed else {
            // Lost the race to a concurrent checkout; void the orphan intent.
            if let Err(e) = state.stripe.cancel_payment_intent(&intent.id).await {
                tracing::warn!("Failed to cancel orphaned payment intent {}: {:?}", intent.id, e);
            }
            return Err(AppError::Conflict(
                "This booking session has already been used".to_string(),
            ));
        };

        Ok(CheckoutResult {
            session: claimed,
            client_secret: intent.client_secret,
        })
    }

    /// Settle a successful payment: create the durable booking, settle the
    /// session, notify both parties. Safe to replay.
    pub async fn confirm_payment(state: &Arc<AppState>, payment_intent_id: &str) -> AppResult<()> {
        if BookingRepository::find_by_payment_intent(&state.db, payment_intent_id)
            .await?
            .is_some()
        {
            tracing::info!(
                "Payment intent {} already settled, ignoring replay",
                payment_intent_id
            );
            return Ok(());
        }

        let session =
            BookingSessionRepository::find_by_payment_intent(&state.db, payment_intent_id).await?;
        let Some(session) = session else {
            tracing::warn!(
                "No booking session for payment intent {}, nothing to confirm",
                payment_intent_id
            );
            return Ok(());
        };

        Self::confirm_paid_session(state, &session).await
    }

    async fn confirm_paid_session(state: &Arc<AppState>, session: &BookingSession) -> AppResult<()> {
        let payment_intent_id = session
            .payment_intent_id
            .clone()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Paid session without intent id")))?;

        let booking = BookingRepository::create_confirmed(
            &state.db,
            CreateBooking {
                host_id: session.host_id.clone(),
                guest_id: session.guest_id.clone(),
                scheduled_date: session.selected_date,
                start_time: session.selected_time.clone(),
                duration_minutes: session.selected_duration,
                price_cents: session.amount_cents,
                currency: session.currency.clone(),
                call_language: session.call_language.clone(),
                payment_intent_id,
            },
        )
        .await
        .map_err(|e| {
            if matches!(e, AppError::Conflict(_)) {
                // The slot was taken between payment and confirmation. The
                // charge needs manual reconciliation; never double-book.
                tracing::error!(
                    "Slot already booked while confirming session {}; manual refund required",
                    session.id
                );
            }
            e
        })?;

        BookingSessionRepository::mark_confirmed(&state.db, &session.id).await?;

        tracing::info!(
            "Booking {} confirmed for session {} ({} {})",
            booking.id,
            session.id,
            booking.scheduled_date,
            booking.start_time
        );

        Self::notify_booking(state, &booking, true).await;
        Ok(())
    }

    /// A failed payment releases the claim so the guest can retry checkout.
    pub async fn payment_failed(state: &Arc<AppState>, payment_intent_id: &str) -> AppResult<()> {
        if BookingSessionRepository::release_claim(&state.db, payment_intent_id).await? {
            tracing::info!(
                "Released booking session claim for failed payment intent {}",
                payment_intent_id
            );
        }
        Ok(())
    }

    /// Cancel a confirmed booking on behalf of either participant.
    pub async fn cancel_booking(
        state: &Arc<AppState>,
        user: &User,
        booking_id: &str,
    ) -> AppResult<()> {
        let booking = BookingRepository::find_by_id(&state.db, booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.guest_id != user.id && booking.host_id != user.id {
            return Err(AppError::Forbidden);
        }

        if !BookingRepository::mark_cancelled(&state.db, booking_id).await? {
            return Err(AppError::Conflict(
                "Only confirmed bookings can be cancelled".to_string(),
            ));
        }

        let booking = BookingRepository::find_by_id(&state.db, booking_id)
            .await?
            .unwrap_or(booking);
        Self::notify_booking(state, &booking, false).await;
        Ok(())
    }

    // Confirmation / cancellation email to both parties; failures only warn.
    async fn notify_booking(state: &Arc<AppState>, booking: &crate::db::models::Booking, confirmed: bool) {
        let mailer_guard = state.mailer.read().await;
        let Some(mailer) = mailer_guard.as_ref() else {
            tracing::debug!("Mail service not configured; skipping booking notification");
            return;
        };

        let guest = match UserRepository::find_by_id(&state.db, &booking.guest_id).await {
            Ok(Some(u)) => u,
            _ => {
                tracing::warn!("Guest {} missing for booking {}", booking.guest_id, booking.id);
                return;
            }
        };
        let host = match UserRepository::find_by_id(&state.db, &booking.host_id).await {
            Ok(Some(u)) => u,
            _ => {
                tracing::warn!("Host {} missing for booking {}", booking.host_id, booking.id);
                return;
            }
        };

        let result = if confirmed {
            mailer.send_booking_confirmed(booking, &guest, &host).await
        } else {
            mailer.send_booking_cancelled(booking, &guest, &host).await
        };
        if let Err(e) = result {
            tracing::warn!("Failed to send booking email for {}: {:?}", booking.id, e);
        }
    }
}
