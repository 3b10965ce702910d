use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub supabase: SupabaseConfig,
    pub stripe: StripeConfig,
    pub agora: AgoraConfig,
    pub assistant: AssistantConfig,
    pub email: EmailConfig,
    pub rate_limit: RateLimitConfig,
    pub booking: BookingConfig,
    pub service_fees: ServiceFeeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// HS256 secret Supabase signs access tokens with ("JWT Secret" in the project settings).
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Endpoint secret for /webhooks/stripe signature verification.
    pub webhook_secret: String,
    /// Platform commission retained from each payment, in percent.
    pub commission_percent: u32,
    /// ISO currency code used when a pricing option does not carry one.
    pub default_currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgoraConfig {
    pub app_id: String,
    pub app_certificate: String,
    /// Validity window for issued RTC tokens, in seconds.
    pub token_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub openai_api_key: Option<String>,
    pub model: String,
    /// Most recent conversation turns forwarded to the model.
    pub max_history_turns: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub sendgrid_api_key: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for the assistant endpoint (/api/loomia/chat)
    pub assistant_per_second: u32,
    /// Burst size for the assistant endpoint
    pub assistant_burst: u32,
    /// Allowed requests per second (per IP) for webhook endpoints (/webhooks/stripe)
    pub webhook_per_second: u32,
    /// Burst size for webhook endpoints
    pub webhook_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Minutes between bookable start times inside an availability window.
    pub slot_increment_minutes: u32,
    /// How long a `created` booking session stays claimable before it is swept to `abandoned`.
    pub session_ttl_minutes: i64,
    /// How often (seconds) the sweeper looks for expired sessions.
    pub sweep_interval_seconds: u64,
}

/// Per-service surcharges, in cents. A missing or unparsable value means the
/// service carries no surcharge; pricing composition never fails on these.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceFeeConfig {
    pub screen_sharing_cents: Option<i64>,
    pub translation_cents: Option<i64>,
    pub recording_cents: Option<i64>,
    pub transcription_cents: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/dialoom.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            supabase: SupabaseConfig {
                jwt_secret: env::var("SUPABASE_JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("SUPABASE_JWT_SECRET".to_string()))?,
            },
            stripe: StripeConfig {
                secret_key: env::var("STRIPE_SECRET_KEY")
                    .map_err(|_| ConfigError::MissingEnv("STRIPE_SECRET_KEY".to_string()))?,
                webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("STRIPE_WEBHOOK_SECRET".to_string()))?,
                commission_percent: env::var("STRIPE_COMMISSION_PERCENT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                default_currency: env::var("STRIPE_DEFAULT_CURRENCY")
                    .unwrap_or_else(|_| "eur".to_string())
                    .to_lowercase(),
            },
            agora: AgoraConfig {
                app_id: env::var("AGORA_APP_ID")
                    .map_err(|_| ConfigError::MissingEnv("AGORA_APP_ID".to_string()))?,
                app_certificate: env::var("AGORA_APP_CERTIFICATE")
                    .map_err(|_| ConfigError::MissingEnv("AGORA_APP_CERTIFICATE".to_string()))?,
                token_ttl_seconds: env::var("AGORA_TOKEN_TTL_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
            },
            assistant: AssistantConfig {
                openai_api_key: env::var("OPENAI_API_KEY").ok(),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                max_history_turns: env::var("ASSISTANT_MAX_HISTORY_TURNS")
                    .unwrap_or_else(|_| "12".to_string())
                    .parse()
                    .unwrap_or(12),
            },
            email: EmailConfig {
                sendgrid_api_key: env::var("SENDGRID_API_KEY").ok(),
                from_address: env::var("EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "no-reply@dialoom.com".to_string()),
                from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Dialoom".to_string()),
            },
            rate_limit: RateLimitConfig {
                assistant_per_second: env::var("RATE_LIMIT_ASSISTANT_PER_SECOND")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
                assistant_burst: env::var("RATE_LIMIT_ASSISTANT_BURST")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                webhook_per_second: env::var("RATE_LIMIT_WEBHOOKS_PER_SECOND")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                webhook_burst: env::var("RATE_LIMIT_WEBHOOKS_BURST")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .unwrap_or(50),
            },
            booking: BookingConfig {
                slot_increment_minutes: env::var("BOOKING_SLOT_INCREMENT_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .unwrap_or(15),
                session_ttl_minutes: env::var("BOOKING_SESSION_TTL_MINUTES")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                sweep_interval_seconds: env::var("BOOKING_SWEEP_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },
            service_fees: ServiceFeeConfig {
                screen_sharing_cents: parse_fee_cents("SERVICE_FEE_SCREEN_SHARING"),
                translation_cents: parse_fee_cents("SERVICE_FEE_TRANSLATION"),
                recording_cents: parse_fee_cents("SERVICE_FEE_RECORDING"),
                transcription_cents: parse_fee_cents("SERVICE_FEE_TRANSCRIPTION"),
            },
        })
    }
}

/// Read a fee env var given as a decimal amount (e.g. "10" or "7.50") into cents.
/// Missing or malformed values yield None so composition treats them as zero.
fn parse_fee_cents(var: &str) -> Option<i64> {
    let raw = env::var(var).ok()?;
    match crate::services::pricing::parse_decimal_cents(raw.trim()) {
        Ok(cents) => Some(cents),
        Err(_) => {
            tracing::warn!("Ignoring malformed fee value in {}: {:?}", var, raw);
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/dialoom.db".to_string(),
                max_connections: 5,
            },
            supabase: SupabaseConfig {
                jwt_secret: String::new(),
            },
            stripe: StripeConfig {
                secret_key: String::new(),
                webhook_secret: String::new(),
                commission_percent: 10,
                default_currency: "eur".to_string(),
            },
            agora: AgoraConfig {
                app_id: String::new(),
                app_certificate: String::new(),
                token_ttl_seconds: 3600,
            },
            assistant: AssistantConfig {
                openai_api_key: None,
                model: "gpt-4o-mini".to_string(),
                max_history_turns: 12,
            },
            email: EmailConfig {
                sendgrid_api_key: None,
                from_address: "no-reply@dialoom.com".to_string(),
                from_name: "Dialoom".to_string(),
            },
            rate_limit: RateLimitConfig {
                assistant_per_second: 2,
                assistant_burst: 5,
                webhook_per_second: 10,
                webhook_burst: 50,
            },
            booking: BookingConfig {
                slot_increment_minutes: 15,
                session_ttl_minutes: 30,
                sweep_interval_seconds: 60,
            },
            service_fees: ServiceFeeConfig {
                screen_sharing_cents: None,
                translation_cents: None,
                recording_cents: None,
                transcription_cents: None,
            },
        }
    }
}
