//! Backend entry-point: loads settings, connects adapters and serves the REST API.

mod server;

use std::ffi::OsString;
use std::path::Path;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use cap_std::{ambient_authority, fs::Dir};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lms_backend::inbound::http::health::HealthState;
use lms_backend::outbound::persistence::{DbPool, PoolConfig};
use lms_backend::settings::{ProgressionSettings, ServerSettings};
use server::{ServerConfig, create_server};

const PROGRAM_NAME: &str = "lms-backend";

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter([OsString::from(PROGRAM_NAME)])
        .map_err(|e| std::io::Error::other(format!("failed to load server settings: {e}")))?;
    let policy = ProgressionSettings::load_from_iter([OsString::from(PROGRAM_NAME)])
        .map_err(|e| std::io::Error::other(format!("failed to load progression settings: {e}")))?
        .to_policy()
        .map_err(std::io::Error::other)?;
    if policy.quiz_gate_cooldown != policy.quiz_retry_hint {
        info!(
            gate_minutes = policy.quiz_gate_cooldown.num_minutes(),
            hint_minutes = policy.quiz_retry_hint.num_minutes(),
            "quiz gate cooldown and retry hint differ"
        );
    }

    let key = load_session_key(&settings)?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let webhook = settings
        .notification_webhook_url()
        .map_err(std::io::Error::other)?;

    let database_url = settings
        .database_url
        .clone()
        .ok_or_else(|| std::io::Error::other("LMS_DATABASE_URL is not set"))?;
    let pool_config =
        PoolConfig::new(database_url).with_max_connections(settings.database_max_connections());
    let db_pool = DbPool::new(pool_config)
        .await
        .map_err(std::io::Error::other)?;

    let config = ServerConfig::new(
        key,
        settings.session_cookie_secure(),
        SameSite::Lax,
        bind_addr,
        db_pool,
    )
    .with_certificate_dir(settings.certificate_dir())
    .with_webhook(webhook)
    .with_policy(policy);

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "listening");
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}

fn load_session_key(settings: &ServerSettings) -> std::io::Result<Key> {
    let key_path = settings.session_key_file();
    match read_key_file(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            if cfg!(debug_assertions) || settings.session_allow_ephemeral {
                warn!(path = %key_path.display(), error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {}: {e}",
                    key_path.display()
                )))
            }
        }
    }
}

fn read_key_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "session key path must name a file",
        )
    })?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read(file_name)
}
