use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::Config;
use crate::db::models::{Booking, User};
use crate::error::{AppError, AppResult};
use crate::i18n;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// One outbound transactional email.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

/// Delivery seam: production uses SendGrid, tests capture messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()>;
}

// ============================================================================
// SendGrid transport
// ============================================================================

pub struct SendGridTransport {
    client: Client,
    api_key: String,
    from_address: String,
    from_name: String,
}

#[derive(Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()> {
        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &email.to_address,
                    name: &email.to_name,
                }],
            }],
            from: Address {
                email: &self.from_address,
                name: &self.from_name,
            },
            subject: &email.subject,
            content: vec![Content {
                content_type: "text/plain",
                value: &email.body,
            }],
        };

        let response = self
            .client
            .post(SENDGRID_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!(
                "SendGrid rejected the message: {} {}",
                status, body
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Mail service
// ============================================================================

pub struct MailService {
    transport: Box<dyn MailTransport>,
}

impl MailService {
    /// Returns None when no SendGrid key is configured; email then degrades
    /// to log lines instead of failing bookings.
    pub fn new(config: &Config) -> Option<Self> {
        let api_key = config.email.sendgrid_api_key.clone()?;
        Some(Self {
            transport: Box::new(SendGridTransport {
                client: Client::new(),
                api_key,
                from_address: config.email.from_address.clone(),
                from_name: config.email.from_name.clone(),
            }),
        })
    }

    #[cfg(test)]
    pub fn with_transport(transport: Box<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Confirmation to both parties once a payment settled.
    pub async fn send_booking_confirmed(
        &self,
        booking: &Booking,
        guest: &User,
        host: &User,
    ) -> AppResult<()> {
        for (recipient, other) in [(guest, host), (host, guest)] {
            let email = render_booking_email(
                "email.booking_confirmed.subject",
                "email.booking_confirmed.body",
                booking,
                recipient,
                other,
            );
            self.transport.deliver(&email).await?;
        }
        Ok(())
    }

    /// Cancellation notice to both parties.
    pub async fn send_booking_cancelled(
        &self,
        booking: &Booking,
        guest: &User,
        host: &User,
    ) -> AppResult<()> {
        for (recipient, other) in [(guest, host), (host, guest)] {
            let email = render_booking_email(
                "email.booking_cancelled.subject",
                "email.booking_cancelled.body",
                booking,
                recipient,
                other,
            );
            self.transport.deliver(&email).await?;
        }
        Ok(())
    }
}

/// Render one booking email for `recipient`, in the call language when set,
/// otherwise the recipient's own language.
fn render_booking_email(
    subject_key: &str,
    body_key: &str,
    booking: &Booking,
    recipient: &User,
    other: &User,
) -> OutgoingEmail {
    let lang = booking
        .call_language
        .as_deref()
        .or(recipient.lang.as_deref());

    let date = booking.scheduled_date.format("%Y-%m-%d").to_string();
    let duration = booking.duration_minutes.to_string();

    OutgoingEmail {
        to_address: recipient.email.clone(),
        to_name: recipient.display_name.clone(),
        subject: i18n::tr(lang, subject_key, None),
        body: i18n::tr(
            lang,
            body_key,
            Some(&[
                ("name", recipient.display_name.as_str()),
                ("other", other.display_name.as_str()),
                ("date", date.as_str()),
                ("time", booking.start_time.as_str()),
                ("duration", duration.as_str()),
            ]),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use tokio::sync::Mutex;

    use super::*;

    struct CapturingTransport {
        sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    }

    #[async_trait]
    impl MailTransport for CapturingTransport {
        async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()> {
            self.sent.lock().await.push(email.clone());
            Ok(())
        }
    }

    fn user(name: &str, email: &str, lang: Option<&str>) -> User {
        let now = Utc::now().naive_utc();
        User {
            id: name.to_lowercase(),
            supabase_id: format!("sb-{}", name.to_lowercase()),
            email: email.to_string(),
            display_name: name.to_string(),
            avatar_url: None,
            lang: lang.map(str::to_string),
            is_host: false,
            is_admin: false,
            host_title: None,
            host_bio: None,
            screen_sharing_enabled: false,
            translation_enabled: false,
            recording_enabled: false,
            transcription_enabled: false,
            stripe_account_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn booking(call_language: Option<&str>) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: "b1".to_string(),
            host_id: "marc".to_string(),
            guest_id: "ana".to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            start_time: "09:30".to_string(),
            duration_minutes: 60,
            price_cents: 10_500,
            currency: "eur".to_string(),
            status: "confirmed".to_string(),
            call_language: call_language.map(str::to_string),
            payment_intent_id: Some("pi_1".to_string()),
            agora_channel: "dialoom-b1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn confirmation_goes_to_both_parties_in_call_language() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = MailService::with_transport(Box::new(CapturingTransport {
            sent: sent.clone(),
        }));
        let guest = user("Ana", "ana@example.com", Some("es"));
        let host = user("Marc", "marc@example.com", Some("es"));

        service
            .send_booking_confirmed(&booking(Some("en")), &guest, &host)
            .await
            .unwrap();

        let sent = sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to_address, "ana@example.com");
        assert_eq!(sent[1].to_address, "marc@example.com");
        // call_language "en" wins over both users' "es"
        assert!(sent[0].subject.contains("confirmed"));
        assert!(sent[1].subject.contains("confirmed"));
    }

    #[tokio::test]
    async fn rendered_email_uses_placeholders() {
        let guest = user("Ana", "ana@example.com", None);
        let host = user("Marc", "marc@example.com", None);

        let email = render_booking_email(
            "email.booking_confirmed.subject",
            "email.booking_confirmed.body",
            &booking(Some("en")),
            &guest,
            &host,
        );

        assert_eq!(email.to_address, "ana@example.com");
        assert!(email.body.contains("Hi Ana"));
        assert!(email.body.contains("Marc"));
        assert!(email.body.contains("2026-09-01"));
        assert!(email.body.contains("09:30"));
        assert!(email.body.contains("60 minutes"));
    }

    #[tokio::test]
    async fn recipient_language_is_used_without_call_language() {
        let guest = user("Ana", "ana@example.com", Some("es"));
        let host = user("Marc", "marc@example.com", Some("es"));

        let email = render_booking_email(
            "email.booking_confirmed.subject",
            "email.booking_confirmed.body",
            &booking(None),
            &guest,
            &host,
        );
        assert!(email.subject.contains("confirmada"));
    }
}
