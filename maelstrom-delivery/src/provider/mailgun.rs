//! MailGun: form-encoded POST with HTTP basic auth.

use async_trait::async_trait;
use maelstrom_common::{Message, outgoing};
use reqwest::{Client, StatusCode};

use super::{Provider, ProviderKind, TRANSPORT_FAILURE};
use crate::config::ProviderConfig;

/// Username MailGun expects alongside the API key
const BASIC_AUTH_USER: &str = "api";

#[derive(Debug)]
pub struct MailGun {
    config: ProviderConfig,
    client: Client,
}

impl MailGun {
    #[must_use]
    pub const fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn form(message: &Message) -> Vec<(&'static str, &str)> {
        let mut form = Vec::with_capacity(message.to().len() + 3);
        form.push(("from", message.from()));
        form.extend(message.to().iter().map(|to| ("to", to.as_str())));
        form.push(("subject", message.subject()));
        form.push(("text", message.text()));
        form
    }
}

#[async_trait]
impl Provider for MailGun {
    async fn send(&self, message: &Message) -> u16 {
        outgoing!(level = DEBUG, "Sending email {} via MailGun", message);

        let response = self
            .client
            .post(&self.config.url)
            .basic_auth(BASIC_AUTH_USER, Some(&self.config.api_key))
            .form(&Self::form(message))
            .send()
            .await;

        match response {
            Ok(response) => {
                outgoing!(level = DEBUG, "MailGun responded {}", response.status());
                response.status().as_u16()
            }
            Err(err) => {
                tracing::error!(provider = "MailGun", error = %err, "Error sending mail");
                TRANSPORT_FAILURE
            }
        }
    }

    async fn health_check(&self) -> bool {
        let response = self
            .client
            .get(&self.config.ping_url)
            .basic_auth(BASIC_AUTH_USER, Some(&self.config.ping_key))
            .send()
            .await;

        match response {
            Ok(response) => {
                outgoing!("MailGun ping responded {}", response.status());
                response.status() == StatusCode::OK
            }
            Err(err) => {
                tracing::warn!(provider = "MailGun", error = %err, "Error reaching server");
                false
            }
        }
    }

    fn name(&self) -> &str {
        ProviderKind::MailGun.as_str()
    }

    fn configure_credential(&mut self, secret: String) {
        self.config.api_key = secret;
    }
}
