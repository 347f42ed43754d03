//! Mandrill: JSON POST with the key in the body.

use async_trait::async_trait;
use maelstrom_common::{Message, outgoing};
use reqwest::Client;
use serde::Serialize;

use super::{Provider, ProviderKind, TRANSPORT_FAILURE};
use crate::config::ProviderConfig;

/// Body Mandrill's ping endpoint answers with when the key is good
const PONG: &str = "\"PONG!\"";

#[derive(Debug)]
pub struct Mandrill {
    config: ProviderConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MandrillMail<'a> {
    key: &'a str,
    message: MandrillMessage<'a>,
}

#[derive(Debug, Serialize)]
struct MandrillMessage<'a> {
    text: &'a str,
    subject: &'a str,
    from_email: &'a str,
    to: Vec<MandrillTo<'a>>,
}

#[derive(Debug, Serialize)]
struct MandrillTo<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct MandrillPing<'a> {
    key: &'a str,
}

impl Mandrill {
    #[must_use]
    pub const fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn payload<'a>(&'a self, message: &'a Message) -> MandrillMail<'a> {
        MandrillMail {
            key: &self.config.api_key,
            message: MandrillMessage {
                text: message.text(),
                subject: message.subject(),
                from_email: message.from(),
                to: message
                    .to()
                    .iter()
                    .map(|email| MandrillTo {
                        email: email.as_str(),
                    })
                    .collect(),
            },
        }
    }
}

#[async_trait]
impl Provider for Mandrill {
    async fn send(&self, message: &Message) -> u16 {
        outgoing!(level = DEBUG, "Sending email {} via Mandrill", message);

        let response = self
            .client
            .post(&self.config.url)
            .json(&self.payload(message))
            .send()
            .await;

        match response {
            Ok(response) => {
                outgoing!(level = DEBUG, "Mandrill responded {}", response.status());
                response.status().as_u16()
            }
            Err(err) => {
                tracing::error!(provider = "Mandrill", error = %err, "Error sending mail");
                TRANSPORT_FAILURE
            }
        }
    }

    async fn health_check(&self) -> bool {
        let response = self
            .client
            .post(&self.config.ping_url)
            .json(&MandrillPing {
                key: &self.config.ping_key,
            })
            .send()
            .await;

        let body = match response {
            Ok(response) => response.text().await,
            Err(err) => Err(err),
        };

        match body {
            Ok(body) if body.trim() == PONG => true,
            Ok(body) => {
                tracing::warn!(provider = "Mandrill", response = %body, "Ping failed");
                false
            }
            Err(err) => {
                tracing::warn!(provider = "Mandrill", error = %err, "Ping failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        ProviderKind::Mandrill.as_str()
    }

    fn configure_credential(&mut self, secret: String) {
        self.config.api_key = secret;
    }
}
