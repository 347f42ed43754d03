//! Third-party delivery integrations.
//!
//! Every integration implements [`Provider`]. The core never looks past that
//! trait: request shapes, authentication and what counts as "healthy" belong
//! to the integration.

mod aws;
mod mailgun;
mod mandrill;
mod sendgrid;

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use async_trait::async_trait;
use maelstrom_common::Message;
use thiserror::Error;

pub use aws::Aws;
pub use mailgun::MailGun;
pub use mandrill::Mandrill;
pub use sendgrid::SendGrid;

use crate::{
    config::{ProviderConfig, ProviderTimeouts},
    error::DeliveryError,
};

/// Status reported when a provider could not be reached at all
pub const TRANSPORT_FAILURE: u16 = 500;

/// A configured third-party integration able to send mail and report its health
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Forward `message`, returning the remote API's status code verbatim.
    ///
    /// Transport failures are reported as [`TRANSPORT_FAILURE`], never as a
    /// panic or error.
    async fn send(&self, message: &Message) -> u16;

    /// Ask the remote API whether it is up. Any failure is `false`.
    async fn health_check(&self) -> bool;

    /// Unique name used as the registry key and status label
    fn name(&self) -> &str;

    /// Replace the send credential. Only possible before the provider is shared.
    fn configure_credential(&mut self, secret: String);
}

/// The integrations maelstrom knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    MailGun,
    SendGrid,
    Mandrill,
    Aws,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MailGun => "MailGun",
            Self::SendGrid => "SendGrid",
            Self::Mandrill => "Mandrill",
            Self::Aws => "AWS",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name did not match any known integration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "MailGun" => Ok(Self::MailGun),
            "SendGrid" => Ok(Self::SendGrid),
            "Mandrill" => Ok(Self::Mandrill),
            "AWS" => Ok(Self::Aws),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Build the integration named by `config`.
///
/// Returns `Ok(None)` for names that match no integration; those are logged
/// and never registered.
///
/// # Errors
///
/// Returns an error if the HTTP client for the integration cannot be built.
pub fn build(
    config: &ProviderConfig,
    timeouts: &ProviderTimeouts,
) -> Result<Option<Box<dyn Provider>>, DeliveryError> {
    let kind = match config.name.parse::<ProviderKind>() {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(provider = %config.name, "{err}, skipping");
            return Ok(None);
        }
    };

    let provider: Box<dyn Provider> = match kind {
        ProviderKind::MailGun => {
            Box::new(MailGun::new(config.clone(), http_client(kind, timeouts)?))
        }
        ProviderKind::SendGrid => {
            Box::new(SendGrid::new(config.clone(), http_client(kind, timeouts)?))
        }
        ProviderKind::Mandrill => {
            Box::new(Mandrill::new(config.clone(), http_client(kind, timeouts)?))
        }
        ProviderKind::Aws => Box::new(Aws::new(config.clone())),
    };

    Ok(Some(provider))
}

fn http_client(
    kind: ProviderKind,
    timeouts: &ProviderTimeouts,
) -> Result<reqwest::Client, DeliveryError> {
    reqwest::Client::builder()
        .user_agent(concat!("maelstrom/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeouts.connect())
        .build()
        .map_err(|source| DeliveryError::HttpClient {
            provider: kind.to_string(),
            source,
        })
}
