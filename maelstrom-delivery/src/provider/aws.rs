//! AWS is recognised in configuration but has no transport yet.

use async_trait::async_trait;
use maelstrom_common::Message;

use super::{Provider, ProviderKind, TRANSPORT_FAILURE};
use crate::config::ProviderConfig;

// TODO: deliver through the SES v2 SendEmail API and probe GetAccount for health.
#[derive(Debug)]
pub struct Aws {
    config: ProviderConfig,
}

impl Aws {
    #[must_use]
    pub const fn new(config: ProviderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provider for Aws {
    async fn send(&self, message: &Message) -> u16 {
        tracing::warn!(
            provider = "AWS",
            endpoint = %self.config.url,
            "Cannot send email {message}: no AWS transport available"
        );
        TRANSPORT_FAILURE
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        ProviderKind::Aws.as_str()
    }

    fn configure_credential(&mut self, secret: String) {
        self.config.api_key = secret;
    }
}
