//! Typed error handling for delivery operations.
//!
//! A request can be turned away at four points before a provider is ever
//! called ([`DispatchError`]). Failures while a provider is talking to its
//! remote API are not errors at all: they become status codes.

use maelstrom_common::ValidationError;
use thiserror::Error;

/// Why a message was not handed to a provider.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The caller did not present the shared secret.
    #[error("Forbidden")]
    Forbidden,

    /// A sender or recipient address was malformed.
    #[error(transparent)]
    InvalidAddress(#[from] ValidationError),

    /// No provider is currently believed healthy.
    #[error("No Mail Server Available.")]
    Unavailable,

    /// The throttle had no free slot. The caller may retry later.
    #[error("Over throttle limit.")]
    Throttled,
}

impl DispatchError {
    /// The HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Forbidden => 403,
            Self::InvalidAddress(_) => 400,
            Self::Unavailable => 503,
            Self::Throttled => 429,
        }
    }

    /// Returns `true` if the same request may succeed later unchanged.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Throttled)
    }
}

/// Errors while assembling the delivery subsystem at startup.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// An HTTP client could not be constructed.
    #[error("Failed to build HTTP client for {provider}: {source}")]
    HttpClient {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// The metadata server could not be reached or answered badly.
    #[error("Credential lookup for {attribute} failed: {reason}")]
    Credential { attribute: String, reason: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
