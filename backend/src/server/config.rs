//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::cookie::{Key, SameSite};
use lms_backend::domain::ProgressionPolicy;
use lms_backend::outbound::persistence::DbPool;
use url::Url;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) certificate_dir: PathBuf,
    pub(crate) webhook_url: Option<Url>,
    pub(crate) policy: ProgressionPolicy,
}

impl ServerConfig {
    /// Construct a server configuration over an established pool.
    ///
    /// Certificates go to `./certificates`, notifications are only logged and
    /// the default progression policy applies until overridden.
    #[must_use]
    pub fn new(
        key: Key,
        cookie_secure: bool,
        same_site: SameSite,
        bind_addr: SocketAddr,
        db_pool: DbPool,
    ) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool,
            certificate_dir: PathBuf::from("certificates"),
            webhook_url: None,
            policy: ProgressionPolicy::default(),
        }
    }

    /// Directory rendered certificates are written to.
    #[must_use]
    pub fn with_certificate_dir(mut self, dir: PathBuf) -> Self {
        self.certificate_dir = dir;
        self
    }

    /// Deliver notifications to `url` instead of only logging them.
    #[must_use]
    pub fn with_webhook(mut self, url: Option<Url>) -> Self {
        self.webhook_url = url;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ProgressionPolicy) -> Self {
        self.policy = policy;
        self
    }
}
