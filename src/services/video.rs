use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::config::Config;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "007";

/// RTC token minting for call rooms.
///
/// Tokens are signed locally with the Agora app certificate: the payload is
/// `app_id|channel|uid|expire_ts` and the signature an HMAC-SHA256 over it.
/// Wire format: `"007"` + base64(signature ++ payload). Media transport
/// itself is entirely Agora's concern.
#[derive(Debug, Clone)]
pub struct VideoService {
    app_id: String,
    app_certificate: String,
    token_ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RtcToken {
    pub token: String,
    pub channel: String,
    pub uid: u32,
    pub app_id: String,
    pub expires_at: DateTime<Utc>,
}

impl VideoService {
    pub fn new(config: &Config) -> Self {
        Self {
            app_id: config.agora.app_id.clone(),
            app_certificate: config.agora.app_certificate.clone(),
            token_ttl_seconds: config.agora.token_ttl_seconds,
        }
    }

    /// Mint a token for one participant of a call channel.
    pub fn issue_token(&self, channel: &str) -> AppResult<RtcToken> {
        let uid: u32 = rand::thread_rng().gen_range(1..u32::MAX);
        let expires_at = Utc::now()
            + chrono::Duration::seconds(
                i64::try_from(self.token_ttl_seconds)
                    .map_err(|_| AppError::Agora("Token TTL out of range".to_string()))?,
            );

        let token = self.build_token(channel, uid, expires_at.timestamp())?;

        Ok(RtcToken {
            token,
            channel: channel.to_string(),
            uid,
            app_id: self.app_id.clone(),
            expires_at,
        })
    }

    fn build_token(&self, channel: &str, uid: u32, expire_ts: i64) -> AppResult<String> {
        if self.app_id.is_empty() || self.app_certificate.is_empty() {
            return Err(AppError::Agora("Agora credentials not configured".to_string()));
        }

        let payload = format!("{}|{}|{}|{}", self.app_id, channel, uid, expire_ts);

        let mut mac = HmacSha256::new_from_slice(self.app_certificate.as_bytes())
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to create HMAC")))?;
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        let mut packed = Vec::with_capacity(signature.len() + payload.len());
        packed.extend_from_slice(&signature);
        packed.extend_from_slice(payload.as_bytes());

        Ok(format!("{}{}", TOKEN_VERSION, BASE64.encode(packed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> VideoService {
        VideoService {
            app_id: "app-id".to_string(),
            app_certificate: "certificate".to_string(),
            token_ttl_seconds: 3600,
        }
    }

    #[test]
    fn token_is_versioned_and_decodable() {
        let token = service().build_token("dialoom-abc", 42, 1_900_000_000).unwrap();
        assert!(token.starts_with(TOKEN_VERSION));

        let decoded = BASE64.decode(&token[TOKEN_VERSION.len()..]).unwrap();
        // 32-byte HMAC-SHA256 signature, then the readable payload.
        let payload = String::from_utf8(decoded[32..].to_vec()).unwrap();
        assert_eq!(payload, "app-id|dialoom-abc|42|1900000000");
    }

    #[test]
    fn token_is_deterministic_for_same_inputs() {
        let service = service();
        let a = service.build_token("dialoom-abc", 42, 1_900_000_000).unwrap();
        let b = service.build_token("dialoom-abc", 42, 1_900_000_000).unwrap();
        assert_eq!(a, b);

        let other = service.build_token("dialoom-abc", 43, 1_900_000_000).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn missing_credentials_fail_minting() {
        let service = VideoService {
            app_id: String::new(),
            app_certificate: String::new(),
            token_ttl_seconds: 3600,
        };
        assert!(service.build_token("dialoom-abc", 42, 1_900_000_000).is_err());
    }

    #[test]
    fn issued_token_expires_in_the_future() {
        let token = service().issue_token("dialoom-abc").unwrap();
        assert!(token.expires_at > Utc::now());
        assert!(token.uid > 0);
    }
}
