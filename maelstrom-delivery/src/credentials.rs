//! Startup-time credential injection.
//!
//! Provider keys and the shared secret can come straight from configuration,
//! or be pulled from a GCE-style instance metadata server so that secrets
//! never have to be written to disk:
//!
//! ```ron
//! credentials: Metadata((
//!     base_url: "http://metadata.google.internal/computeMetadata/v1/instance/attributes",
//!     password_attribute: "emailPW",
//! )),
//! ```
//!
//! Each provider's key is read from the attribute named after the provider.
//! Lookups happen once, before any request is served.

use std::time::Duration;

use maelstrom_common::outgoing;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{auth::SharedSecret, config::ProviderConfig, error::DeliveryError};

const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");

fn default_base_url() -> String {
    "http://metadata.google.internal/computeMetadata/v1/instance/attributes".to_string()
}

fn default_password_attribute() -> String {
    "emailPW".to_string()
}

const fn default_timeout_secs() -> u64 {
    2
}

/// Where credentials are read from
#[derive(Debug, Clone, Default, Deserialize)]
pub enum CredentialSource {
    /// Use `api_key` from each provider declaration
    #[default]
    Config,

    /// Read instance attributes from a metadata server
    Metadata(MetadataConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// URL under which attributes live, one per path segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Attribute holding the shared secret
    #[serde(default = "default_password_attribute")]
    pub password_attribute: String,

    /// Per-lookup timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            password_attribute: default_password_attribute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Resolves credentials from the configured [`CredentialSource`]
#[derive(Debug)]
pub struct CredentialResolver {
    metadata: Option<(MetadataConfig, reqwest::Client)>,
}

impl CredentialResolver {
    /// Create a resolver for `source`
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata HTTP client cannot be built.
    pub fn new(source: CredentialSource) -> Result<Self, DeliveryError> {
        let metadata = match source {
            CredentialSource::Config => None,
            CredentialSource::Metadata(config) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                    .map_err(|source| DeliveryError::HttpClient {
                        provider: "metadata".to_string(),
                        source,
                    })?;
                Some((config, client))
            }
        };

        Ok(Self { metadata })
    }

    /// The send credential for `provider`
    ///
    /// Falls back to the configured `api_key` if the metadata server has no
    /// usable value.
    pub async fn provider_credential(&self, provider: &ProviderConfig) -> String {
        let Some((config, client)) = &self.metadata else {
            tracing::debug!(provider = %provider.name, "Using API key from configuration");
            return provider.api_key.clone();
        };

        match Self::attribute(config, client, &provider.name).await {
            Ok(Some(key)) => {
                tracing::info!(provider = %provider.name, "Using API key from instance metadata");
                key
            }
            Ok(None) => {
                tracing::warn!(
                    provider = %provider.name,
                    "No API key in instance metadata, using configuration"
                );
                provider.api_key.clone()
            }
            Err(err) => {
                tracing::warn!(
                    provider = %provider.name,
                    error = %err,
                    "Instance metadata unavailable, using configuration"
                );
                provider.api_key.clone()
            }
        }
    }

    /// The shared secret, preferring a non-empty metadata value over `configured`
    pub async fn shared_secret(&self, configured: SharedSecret) -> SharedSecret {
        let Some((config, client)) = &self.metadata else {
            return configured;
        };

        match Self::attribute(config, client, &config.password_attribute).await {
            Ok(Some(secret)) => {
                tracing::info!("Using shared secret from instance metadata");
                SharedSecret::new(secret)
            }
            Ok(None) => configured,
            Err(err) => {
                tracing::warn!(error = %err, "Instance metadata unavailable, keeping configured secret");
                configured
            }
        }
    }

    async fn attribute(
        config: &MetadataConfig,
        client: &reqwest::Client,
        name: &str,
    ) -> Result<Option<String>, DeliveryError> {
        let url = format!("{}/{name}", config.base_url.trim_end_matches('/'));
        outgoing!("Fetching instance attribute {}", url);

        let failed = |reason: String| DeliveryError::Credential {
            attribute: name.to_string(),
            reason,
        };

        let response = client
            .get(&url)
            .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            .send()
            .await
            .map_err(|err| failed(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(failed(format!("metadata server answered {}", response.status())));
        }

        let value = response.text().await.map_err(|err| failed(err.to_string()))?;
        let value = value.trim();

        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}
