//! The set of configured providers and their last known health.
//!
//! Membership is fixed once the registry is built: providers are added with
//! `&mut self` before the registry is shared, and nothing is ever removed.
//! After that only the health flags change, written by the
//! [`HealthMonitor`](crate::HealthMonitor) and read by the
//! [`Dispatcher`](crate::Dispatcher).

use std::{collections::BTreeMap, fmt, sync::Arc};

use dashmap::DashMap;
use maelstrom_common::internal;

use crate::{
    config::{ProviderConfig, ProviderTimeouts},
    credentials::CredentialResolver,
    error::DeliveryError,
    provider::{self, Provider},
};

struct RegistryEntry {
    provider: Arc<dyn Provider>,
    healthy: bool,
}

#[derive(Default)]
pub struct Registry {
    entries: DashMap<String, RegistryEntry>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from provider declarations.
    ///
    /// Declarations naming an unknown integration, or repeating a name that is
    /// already registered, are logged and skipped. Every provider receives
    /// its credential from `credentials` before it is registered, and starts
    /// out unhealthy.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider's HTTP client cannot be built.
    pub async fn from_config(
        configs: &[ProviderConfig],
        timeouts: &ProviderTimeouts,
        credentials: &CredentialResolver,
    ) -> Result<Self, DeliveryError> {
        let mut registry = Self::new();

        for config in configs {
            if registry.entries.contains_key(&config.name) {
                tracing::warn!(provider = %config.name, "Provider already registered, skipping duplicate");
                continue;
            }

            internal!(level = INFO, "Adding provider: {}", config.name);

            let Some(mut provider) = provider::build(config, timeouts)? else {
                continue;
            };

            provider.configure_credential(credentials.provider_credential(config).await);
            registry.register(Arc::from(provider));
        }

        Ok(registry)
    }

    /// Add `provider`, initially unhealthy.
    ///
    /// Returns `false` and leaves the registry unchanged if a provider with the
    /// same name is already present.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> bool {
        let name = provider.name().to_string();

        if self.entries.contains_key(&name) {
            tracing::warn!(provider = %name, "Provider already registered, skipping duplicate");
            return false;
        }

        self.entries.insert(
            name,
            RegistryEntry {
                provider,
                healthy: false,
            },
        );
        true
    }

    /// Record the outcome of a health check for the provider called `name`.
    pub fn set_health(&self, name: &str, healthy: bool) {
        match self.entries.get_mut(name) {
            Some(mut entry) => entry.healthy = healthy,
            None => tracing::debug!(provider = %name, "Ignoring health for unregistered provider"),
        }
    }

    /// Name → health for every provider, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.healthy))
            .collect()
    }

    /// Any provider currently marked healthy.
    ///
    /// There is no ordering guarantee: with several healthy providers, which
    /// one is returned depends on the map's internal layout and may differ
    /// between calls. With exactly one healthy provider, that provider is
    /// always returned.
    #[must_use]
    pub fn pick_healthy(&self) -> Option<Arc<dyn Provider>> {
        let picked = self
            .entries
            .iter()
            .find(|entry| entry.healthy)
            .map(|entry| Arc::clone(&entry.provider));

        match &picked {
            Some(provider) => internal!("Selected provider: {}", provider.name()),
            None => tracing::debug!("No providers are currently available"),
        }

        picked
    }

    /// Every registered provider, in no particular order.
    #[must_use]
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(&entry.provider))
            .collect()
    }

    #[must_use]
    pub fn healthy_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.healthy).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}
