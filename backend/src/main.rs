//! Backend entry-point: loads settings, prepares storage and serves the
//! trust engine API.

mod server;

use actix_web::cookie::SameSite;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use krishilok::outbound::persistence::{DbPool, run_pending_migrations};
use server::{ServerConfig, ServerSettings, create_server, health_state_for};

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

    let settings = ServerSettings::load()
        .map_err(|err| std::io::Error::other(format!("failed to load settings: {err}")))?;

    let mut config = ServerConfig::new(
        settings.session_key()?,
        settings.cookie_secure,
        SameSite::Lax,
        settings.bind_addr()?,
    )
    .with_follow_up_policy(settings.follow_up_policy()?)
    .with_retry_policy(settings.retry_policy()?);

    match settings.pool_config() {
        Some(pool_config) => {
            let applied = run_pending_migrations(pool_config.database_url())
                .await
                .map_err(std::io::Error::other)?;
            info!(applied, "database migrations complete");
            let pool = DbPool::new(pool_config)
                .await
                .map_err(std::io::Error::other)?;
            config = config.with_db_pool(pool);
        }
        None => warn!("no database configured; scores live in process memory"),
    }

    let health_state = health_state_for(&config);
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}
