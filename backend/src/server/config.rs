//! Server settings loaded via OrthoConfig and the wiring configuration built
//! from them.

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

use krishilok::domain::{FollowUpPolicy, RetryPolicy};
use krishilok::outbound::persistence::{DbPool, PoolConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Settings read from CLI flags, `KRISHILOK_*` environment variables and
/// configuration files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "KRISHILOK")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Upper bound on pooled connections.
    pub pool_max_size: Option<u32>,
    /// File holding the session signing key material.
    pub session_key_file: Option<PathBuf>,
    /// Generate a throwaway session key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Mark the session cookie `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Days between feedback and its follow-up prompt.
    pub follow_up_delay_days: Option<u32>,
    /// Attempts per optimistic score recompute.
    pub recompute_max_attempts: Option<u32>,
}

impl ServerSettings {
    /// Return the configured bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when the address does not parse.
    pub fn bind_addr(&self) -> std::io::Result<SocketAddr> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err| {
            std::io::Error::other(format!("invalid bind address {raw}: {err}"))
        })
    }

    /// Return the configured session key path.
    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    /// Pool settings when a database URL is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        let url = self.database_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        let config = PoolConfig::new(url);
        Some(match self.pool_max_size {
            Some(max_size) => config.with_max_size(max_size),
            None => config,
        })
    }

    /// Validated follow-up delay.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when the delay lies outside 10 to 15 days.
    pub fn follow_up_policy(&self) -> std::io::Result<FollowUpPolicy> {
        self.follow_up_delay_days
            .map_or(Ok(FollowUpPolicy::default()), FollowUpPolicy::new)
            .map_err(|err| std::io::Error::other(err.to_string()))
    }

    /// Validated recompute retry policy.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when the attempt count is zero.
    pub fn retry_policy(&self) -> std::io::Result<RetryPolicy> {
        self.recompute_max_attempts
            .map_or(Ok(RetryPolicy::default()), RetryPolicy::new)
            .map_err(|err| std::io::Error::other(err.to_string()))
    }

    /// Load the session key, generating a temporary one in development.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when the key file is unreadable and
    /// ephemeral keys are not allowed.
    pub fn session_key(&self) -> std::io::Result<Key> {
        let key_path = self.session_key_file();
        match std::fs::read(&key_path) {
            Ok(bytes) => Ok(Key::derive_from(&bytes)),
            Err(e) => {
                if cfg!(debug_assertions) || self.session_allow_ephemeral {
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
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) follow_up_policy: FollowUpPolicy,
    pub(crate) retry_policy: RetryPolicy,
}

impl ServerConfig {
    /// Construct a server configuration using application preferences.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool: None,
            follow_up_policy: FollowUpPolicy::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Attach a database connection pool for the Diesel adapters.
    ///
    /// Without one the server runs on the in-memory store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_follow_up_policy(mut self, policy: FollowUpPolicy) -> Self {
        self.follow_up_policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}
