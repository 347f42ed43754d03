//! SendGrid: v3 mail/send JSON API with bearer auth.

use async_trait::async_trait;
use maelstrom_common::{Message, outgoing};
use reqwest::Client;
use serde::Serialize;

use super::{Provider, ProviderKind, TRANSPORT_FAILURE};
use crate::config::ProviderConfig;

#[derive(Debug)]
pub struct SendGrid {
    config: ProviderConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

impl SendGrid {
    #[must_use]
    pub const fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn payload(message: &Message) -> SendGridRequest<'_> {
        SendGridRequest {
            personalizations: vec![Personalization {
                to: message
                    .to()
                    .iter()
                    .map(|email| EmailAddress {
                        email: email.as_str(),
                    })
                    .collect(),
            }],
            from: EmailAddress {
                email: message.from(),
            },
            subject: message.subject(),
            content: vec![Content {
                content_type: "text/plain",
                value: message.text(),
            }],
        }
    }
}

#[async_trait]
impl Provider for SendGrid {
    async fn send(&self, message: &Message) -> u16 {
        outgoing!(level = DEBUG, "Sending email {} via SendGrid", message);

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&Self::payload(message))
            .send()
            .await;

        match response {
            Ok(response) => {
                outgoing!(level = DEBUG, "SendGrid responded {}", response.status());
                response.status().as_u16()
            }
            Err(err) => {
                tracing::error!(provider = "SendGrid", error = %err, "Error sending mail");
                TRANSPORT_FAILURE
            }
        }
    }

    async fn health_check(&self) -> bool {
        let response = self
            .client
            .get(&self.config.ping_url)
            .bearer_auth(&self.config.ping_key)
            .send()
            .await;

        match response {
            Ok(response) => {
                outgoing!("SendGrid ping responded {}", response.status());
                response.status().is_success()
            }
            Err(err) => {
                tracing::warn!(provider = "SendGrid", error = %err, "Error reaching server");
                false
            }
        }
    }

    fn name(&self) -> &str {
        ProviderKind::SendGrid.as_str()
    }

    fn configure_credential(&mut self, secret: String) {
        self.config.api_key = secret;
    }
}
