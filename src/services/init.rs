//! Initialization helpers for the application:
//! - database connection + migrations
//! - optional integrations (assistant / email)
//! - background worker spawn helpers
//!
//! This module centralizes bits that used to live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Initialize SQLite database connection and run migrations.
///
/// Creates the parent directory for the database file (if applicable),
/// opens a connection pool using `create_if_missing(true)` and runs migrations.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    // Extract the file path from the database URL
    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Initialize optional integrations (assistant, email) and store them into `AppState`.
///
/// Both degrade gracefully: a missing API key only disables the matching
/// feature, it never stops the application from starting.
pub async fn initialize_optional_integrations(state: &Arc<crate::AppState>) {
    match crate::services::assistant::AssistantService::new(&state.config) {
        Some(assistant) => {
            *state.assistant.write().await = Some(assistant);
            tracing::info!("Loomia assistant initialized");
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; /api/loomia/chat will answer 503");
        }
    }

    match crate::services::email::MailService::new(&state.config) {
        Some(mailer) => {
            *state.mailer.write().await = Some(mailer);
            tracing::info!("SendGrid mail service initialized");
        }
        None => {
            tracing::warn!("SENDGRID_API_KEY not set; booking emails are disabled");
        }
    }
}

/// Spawn background workers:
/// - periodic sweep of expired booking sessions (`created` -> `abandoned`)
///
/// These are spawned as `tokio::spawn` tasks. The function returns a vector of
/// `JoinHandle<()>`s so callers can await task shutdown. Each worker listens
/// for a shutdown notification via a `tokio::sync::broadcast::Sender<()>`.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    // Booking session sweeper
    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let now = chrono::Utc::now().naive_utc();
                match crate::db::BookingSessionRepository::sweep_expired(&state.db, now).await {
                    Ok(0) => {}
                    Ok(n) => {
                        tracing::info!("Swept {} expired booking sessions to abandoned", n);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to sweep expired booking sessions: {:?}", e);
                    }
                }

                // Wait for the next sweep cycle or exit early on shutdown.
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Booking session sweeper shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs(
                        state.config.booking.sweep_interval_seconds,
                    )) => {}
                }
            }
        }));
    }

    handles
}
