//! Port bundle shared by the progression services.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    CertificateRenderer, IdentityLookup, NotificationDispatcher, SubscriptionLookup,
};

/// Adapters the progression services are built from.
pub struct ProgressionPorts<S> {
    /// Transactional progression state.
    pub store: Arc<S>,
    pub identities: Arc<dyn IdentityLookup>,
    pub subscriptions: Arc<dyn SubscriptionLookup>,
    pub renderer: Arc<dyn CertificateRenderer>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}

impl<S> ProgressionPorts<S> {
    /// Build a strongly-typed port bundle.
    pub fn new(
        store: Arc<S>,
        identities: Arc<dyn IdentityLookup>,
        subscriptions: Arc<dyn SubscriptionLookup>,
        renderer: Arc<dyn CertificateRenderer>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identities,
            subscriptions,
            renderer,
            notifier,
            clock,
        }
    }
}

impl<S> Clone for ProgressionPorts<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identities: Arc::clone(&self.identities),
            subscriptions: Arc::clone(&self.subscriptions),
            renderer: Arc::clone(&self.renderer),
            notifier: Arc::clone(&self.notifier),
            clock: Arc::clone(&self.clock),
        }
    }
}
