/*
Simple i18n helper for the backend.

This module provides:
- A tiny embedded translations store for ES/EN (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let subject = i18n::t("email.booking_confirmed.subject");
    let body = i18n::tr(Some("en"), "email.booking_confirmed.body", Some(&[("host", "Laura"), ("date", "2026-08-12"), ("time", "09:30")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `es`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "es";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const ES_JSON: &str = r#"
{
  "email.booking_confirmed.subject": "Tu sesión en Dialoom está confirmada",
  "email.booking_confirmed.body": "Hola {name},\n\nTu videollamada con {other} está confirmada.\n\n📅 Fecha: {date}\n🕐 Hora: {time}\n⏱ Duración: {duration} minutos\n\nPodrás unirte a la llamada desde tu panel de Dialoom unos minutos antes de la hora de inicio.\n\nGracias por usar Dialoom.",
  "email.booking_cancelled.subject": "Tu sesión en Dialoom ha sido cancelada",
  "email.booking_cancelled.body": "Hola {name},\n\nLa videollamada con {other} prevista para el {date} a las {time} ha sido cancelada.\n\nSi no has solicitado esta cancelación, ponte en contacto con nosotros.",
  "validation.missing_selection": "Faltan datos de la reserva: revisa fecha, hora y duración antes de continuar",
  "validation.slot_taken": "Esa hora ya no está disponible, elige otra",
  "assistant.unavailable": "El asistente Loomia no está disponible en este momento"
}
"#;

const EN_JSON: &str = r#"
{
  "email.booking_confirmed.subject": "Your Dialoom session is confirmed",
  "email.booking_confirmed.body": "Hi {name},\n\nYour video call with {other} is confirmed.\n\n📅 Date: {date}\n🕐 Time: {time}\n⏱ Duration: {duration} minutes\n\nYou can join the call from your Dialoom dashboard a few minutes before the start time.\n\nThanks for using Dialoom.",
  "email.booking_cancelled.subject": "Your Dialoom session was cancelled",
  "email.booking_cancelled.body": "Hi {name},\n\nThe video call with {other} scheduled for {date} at {time} has been cancelled.\n\nIf you did not request this cancellation, please contact us.",
  "validation.missing_selection": "Your booking is incomplete: check date, time and duration before continuing",
  "validation.slot_taken": "That time is no longer available, please pick another",
  "assistant.unavailable": "The Loomia assistant is not available right now"
}
"#;

fn load() -> HashMap<String, HashMap<String, String>> {
    let mut map = HashMap::new();

    let es: HashMap<String, String> =
        serde_json::from_str(ES_JSON).expect("embedded ES translations must be valid JSON");
    let en: HashMap<String, String> =
        serde_json::from_str(EN_JSON).expect("embedded EN translations must be valid JSON");

    map.insert("es".to_string(), es);
    map.insert("en".to_string(), en);
    map
}

/// Look up `key` for `lang` (falling back to DEFAULT_LANG, then to the key
/// itself) and substitute `{name}` placeholders from `params`.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let store = TRANSLATIONS.get_or_init(load);

    let lang = lang
        .map(|l| l.to_lowercase())
        .filter(|l| store.contains_key(l))
        .unwrap_or_else(|| DEFAULT_LANG.to_string());

    let template = store
        .get(&lang)
        .and_then(|m| m.get(key))
        .or_else(|| store.get(DEFAULT_LANG).and_then(|m| m.get(key)))
        .cloned()
        .unwrap_or_else(|| key.to_string());

    let mut out = template;
    if let Some(params) = params {
        for (name, value) in params {
            out = out.replace(&format!("{{{}}}", name), value);
        }
    }
    out
}

/// Convenience wrapper using the default language.
pub fn t(key: &str) -> String {
    tr(None, key, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let body = tr(
            Some("en"),
            "email.booking_cancelled.body",
            Some(&[
                ("name", "Ana"),
                ("other", "Marc"),
                ("date", "2026-08-12"),
                ("time", "09:30"),
            ]),
        );
        assert!(body.contains("Hi Ana"));
        assert!(body.contains("Marc"));
        assert!(body.contains("2026-08-12 at 09:30"));
    }

    #[test]
    fn unknown_lang_falls_back_to_default() {
        let subject = tr(Some("de"), "email.booking_confirmed.subject", None);
        assert_eq!(subject, "Tu sesión en Dialoom está confirmada");
    }

    #[test]
    fn unknown_key_returns_key() {
        assert_eq!(tr(None, "no.such.key", None), "no.such.key");
    }
}
