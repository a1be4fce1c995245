//! Builders wiring outbound adapters into the HTTP state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use lms_backend::domain::ProgressionPorts;
use lms_backend::domain::ports::{CertificateRenderer, NotificationDispatcher};
use lms_backend::inbound::http::state::HttpState;
use lms_backend::outbound::certificates::HtmlCertificateRenderer;
use lms_backend::outbound::notifications::{
    TracingNotificationDispatcher, WebhookNotificationDispatcher,
};
use lms_backend::outbound::persistence::{
    DieselIdentityLookup, DieselLearningStore, DieselSubscriptionLookup,
};
use tracing::info;
use url::Url;

use super::ServerConfig;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Select the webhook dispatcher when an endpoint is configured, otherwise
/// the log-only dispatcher.
fn build_notifier(webhook_url: Option<Url>) -> std::io::Result<Arc<dyn NotificationDispatcher>> {
    match webhook_url {
        Some(url) => {
            info!(endpoint = %url, "delivering notifications by webhook");
            let dispatcher = WebhookNotificationDispatcher::new(url, WEBHOOK_TIMEOUT)
                .map_err(|err| std::io::Error::other(format!("webhook client: {err}")))?;
            Ok(Arc::new(dispatcher))
        }
        None => Ok(Arc::new(TracingNotificationDispatcher)),
    }
}

fn build_renderer(dir: &Path) -> std::io::Result<Arc<dyn CertificateRenderer>> {
    let renderer = HtmlCertificateRenderer::open(dir)
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(Arc::new(renderer))
}

/// Build the shared HTTP state over the PostgreSQL adapters.
///
/// # Errors
/// Fails when the certificate directory cannot be opened or the webhook
/// client cannot be constructed.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let pool = config.db_pool.clone();
    let ports = ProgressionPorts::new(
        Arc::new(DieselLearningStore::new(pool.clone())),
        Arc::new(DieselIdentityLookup::new(pool.clone())),
        Arc::new(DieselSubscriptionLookup::new(pool)),
        build_renderer(&config.certificate_dir)?,
        build_notifier(config.webhook_url.clone())?,
        Arc::new(mockable::DefaultClock),
    );
    Ok(web::Data::new(HttpState::from_ports(ports, config.policy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_backend::test_support::scratch::ScratchDir;
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some("https://hooks.example.test/lms"))]
    fn notifier_builds_for_either_delivery_mode(#[case] endpoint: Option<&str>) {
        let url = endpoint.map(|raw| Url::parse(raw).expect("valid url"));
        assert!(build_notifier(url).is_ok());
    }

    #[rstest]
    fn renderer_creates_missing_directories() {
        let scratch = ScratchDir::new().expect("scratch dir");
        build_renderer(&scratch.path().join("issued").join("2026")).expect("renderer opens");
        assert!(scratch.contains("issued/2026"));
    }

    #[rstest]
    fn renderer_rejects_a_file_path() {
        let scratch = ScratchDir::new().expect("scratch dir");
        scratch.write("occupied", b"taken").expect("write file");
        assert!(build_renderer(&scratch.path().join("occupied").join("certs")).is_err());
    }
}
