use serde::{Deserialize, Serialize};

use crate::config::ServiceFeeConfig;
use crate::db::models::User;

/// Price composition for a booking.
///
/// Prices travel as decimal strings on the wire ("90" or "90.50") and live
/// as integer cents at rest; composition itself is plain integer arithmetic.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PriceParseError {
    #[error("not a decimal amount")]
    Malformed,
    #[error("amounts cannot be negative")]
    Negative,
    #[error("at most two decimal places are allowed")]
    TooPrecise,
}

/// Parse a decimal amount string ("90", "90.5", "90.50") into cents.
pub fn parse_decimal_cents(s: &str) -> Result<i64, PriceParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(PriceParseError::Malformed);
    }
    if s.starts_with('-') {
        return Err(PriceParseError::Negative);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(PriceParseError::Malformed);
    }
    if frac.len() > 2 {
        return Err(PriceParseError::TooPrecise);
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(PriceParseError::Malformed);
    }

    let whole: i64 = whole.parse().map_err(|_| PriceParseError::Malformed)?;
    let frac_cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| PriceParseError::Malformed)? * 10,
        _ => frac.parse().map_err(|_| PriceParseError::Malformed)?,
    };

    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .ok_or(PriceParseError::Malformed)
}

/// Format cents as a two-decimal amount string.
pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

/// The four optional add-on services a guest can toggle on a booking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSelection {
    #[serde(default)]
    pub screen_sharing: bool,
    #[serde(default)]
    pub translation: bool,
    #[serde(default)]
    pub recording: bool,
    #[serde(default)]
    pub transcription: bool,
}

/// Total price: base plus the surcharge of every toggled service the host
/// actually offers. A missing fee configuration contributes zero, so the
/// result is always >= base and composition never fails.
pub fn compose_total(
    base_cents: i64,
    selection: &ServiceSelection,
    host: &User,
    fees: &ServiceFeeConfig,
) -> i64 {
    let mut total = base_cents;

    if selection.screen_sharing && host.screen_sharing_enabled {
        total += fees.screen_sharing_cents.unwrap_or(0);
    }
    if selection.translation && host.translation_enabled {
        total += fees.translation_cents.unwrap_or(0);
    }
    if selection.recording && host.recording_enabled {
        total += fees.recording_cents.unwrap_or(0);
    }
    if selection.transcription && host.transcription_enabled {
        total += fees.transcription_cents.unwrap_or(0);
    }

    total
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn host_with_services(
        screen_sharing: bool,
        translation: bool,
        recording: bool,
        transcription: bool,
    ) -> User {
        let now = Utc::now().naive_utc();
        User {
            id: "h".to_string(),
            supabase_id: "sb-h".to_string(),
            email: "h@example.com".to_string(),
            display_name: "Host".to_string(),
            avatar_url: None,
            lang: None,
            is_host: true,
            is_admin: false,
            host_title: None,
            host_bio: None,
            screen_sharing_enabled: screen_sharing,
            translation_enabled: translation,
            recording_enabled: recording,
            transcription_enabled: transcription,
            stripe_account_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn fees() -> ServiceFeeConfig {
        ServiceFeeConfig {
            screen_sharing_cents: Some(1_000),
            translation_cents: Some(1_500),
            recording_cents: Some(500),
            transcription_cents: Some(800),
        }
    }

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(parse_decimal_cents("90"), Ok(9_000));
        assert_eq!(parse_decimal_cents("90.5"), Ok(9_050));
        assert_eq!(parse_decimal_cents("90.50"), Ok(9_050));
        assert_eq!(parse_decimal_cents("0"), Ok(0));
        assert_eq!(parse_decimal_cents(" 12.34 "), Ok(1_234));
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert_eq!(parse_decimal_cents("-5"), Err(PriceParseError::Negative));
        assert_eq!(parse_decimal_cents("1.234"), Err(PriceParseError::TooPrecise));
        assert_eq!(parse_decimal_cents("abc"), Err(PriceParseError::Malformed));
        assert_eq!(parse_decimal_cents("1,50"), Err(PriceParseError::Malformed));
        assert_eq!(parse_decimal_cents(""), Err(PriceParseError::Malformed));
        assert_eq!(parse_decimal_cents("."), Err(PriceParseError::Malformed));
    }

    #[test]
    fn formats_cents_with_two_decimals() {
        assert_eq!(format_cents(9_000), "90.00");
        assert_eq!(format_cents(9_050), "90.50");
        assert_eq!(format_cents(5), "0.05");
    }

    #[test]
    fn composes_base_plus_enabled_surcharges() {
        // Base 90 + screen sharing 10 + recording 5 = 105.
        let host = host_with_services(true, true, true, true);
        let selection = ServiceSelection {
            screen_sharing: true,
            recording: true,
            ..Default::default()
        };
        assert_eq!(compose_total(9_000, &selection, &host, &fees()), 10_500);
    }

    #[test]
    fn total_is_never_below_base() {
        let host = host_with_services(false, false, false, false);
        let selection = ServiceSelection {
            screen_sharing: true,
            translation: true,
            recording: true,
            transcription: true,
        };
        assert_eq!(compose_total(9_000, &selection, &host, &fees()), 9_000);
    }

    #[test]
    fn host_gating_filters_surcharges() {
        // Guest toggles everything; host only offers translation.
        let host = host_with_services(false, true, false, false);
        let selection = ServiceSelection {
            screen_sharing: true,
            translation: true,
            recording: true,
            transcription: true,
        };
        assert_eq!(compose_total(9_000, &selection, &host, &fees()), 10_500);
    }

    #[test]
    fn missing_fee_config_reads_as_zero() {
        let host = host_with_services(true, true, true, true);
        let selection = ServiceSelection {
            screen_sharing: true,
            translation: true,
            recording: true,
            transcription: true,
        };
        let empty = ServiceFeeConfig {
            screen_sharing_cents: None,
            translation_cents: None,
            recording_cents: None,
            transcription_cents: None,
        };
        assert_eq!(compose_total(9_000, &selection, &host, &empty), 9_000);
    }

    #[test]
    fn composition_is_order_independent() {
        let host = host_with_services(true, true, true, true);
        let all = ServiceSelection {
            screen_sharing: true,
            translation: true,
            recording: true,
            transcription: true,
        };
        // The sum of individual surcharges equals the all-at-once total.
        let base = 9_000;
        let f = fees();
        let individually: i64 = [
            ServiceSelection { screen_sharing: true, ..Default::default() },
            ServiceSelection { translation: true, ..Default::default() },
            ServiceSelection { recording: true, ..Default::default() },
            ServiceSelection { transcription: true, ..Default::default() },
        ]
        .iter()
        .map(|sel| compose_total(0, sel, &host, &f))
        .sum();
        assert_eq!(compose_total(base, &all, &host, &f), base + individually);
    }
}
