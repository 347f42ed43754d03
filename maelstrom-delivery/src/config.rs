//! Delivery configuration: which providers exist and how hard to drive them.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::DeliveryError;

const fn default_health_check_period() -> u64 {
    60
}

const fn default_throttle_capacity() -> usize {
    5
}

const fn default_throttle_window() -> u64 {
    1000
}

/// Declaration of a single third-party provider
///
/// ```ron
/// (
///     name: "MailGun",
///     url: "https://api.mailgun.net/v3/example.com/messages",
///     ping_url: "https://api.mailgun.net/v3/domains",
///     api_key: "key-...",
///     ping_key: "pubkey-...",
/// )
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Integration name; also the label reported by the status endpoint
    pub name: String,

    /// Endpoint messages are sent to
    #[serde(default)]
    pub url: String,

    /// Endpoint polled by the health monitor
    #[serde(default)]
    pub ping_url: String,

    /// Credential used when sending
    #[serde(default)]
    pub api_key: String,

    /// Credential used when polling health
    #[serde(default)]
    pub ping_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("ping_url", &self.ping_url)
            .finish_non_exhaustive()
    }
}

/// Bounds on every outbound call to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTimeouts {
    /// Upper bound on a single send
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::send_secs")]
    pub send_secs: u64,

    /// Upper bound on a single health check
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::health_check_secs")]
    pub health_check_secs: u64,

    /// TCP connect timeout for provider HTTP clients
    ///
    /// Default: 5 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,
}

mod defaults {
    pub const fn send_secs() -> u64 {
        30
    }

    pub const fn health_check_secs() -> u64 {
        10
    }

    pub const fn connect_secs() -> u64 {
        5
    }
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            send_secs: defaults::send_secs(),
            health_check_secs: defaults::health_check_secs(),
            connect_secs: defaults::connect_secs(),
        }
    }
}

impl ProviderTimeouts {
    #[must_use]
    pub const fn send(&self) -> Duration {
        Duration::from_secs(self.send_secs)
    }

    #[must_use]
    pub const fn health_check(&self) -> Duration {
        Duration::from_secs(self.health_check_secs)
    }

    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

/// Everything the delivery core needs at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Providers in declaration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Seconds between health passes
    ///
    /// Default: 60
    #[serde(default = "default_health_check_period")]
    pub health_check_period_secs: u64,

    /// Sends admitted per throttle window
    ///
    /// Default: 5
    #[serde(default = "default_throttle_capacity")]
    pub throttle_capacity: usize,

    /// How long an admitted send holds its slot (milliseconds)
    ///
    /// Default: 1000
    #[serde(default = "default_throttle_window")]
    pub throttle_window_millis: u64,

    #[serde(default)]
    pub timeouts: ProviderTimeouts,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            health_check_period_secs: default_health_check_period(),
            throttle_capacity: default_throttle_capacity(),
            throttle_window_millis: default_throttle_window(),
            timeouts: ProviderTimeouts::default(),
        }
    }
}

impl DeliveryConfig {
    /// The health-check period, falling back to the default when unset or zero
    #[must_use]
    pub fn health_check_period(&self) -> Duration {
        if self.health_check_period_secs == 0 {
            tracing::warn!(
                default = default_health_check_period(),
                "Health check period of 0 is not allowed, using the default"
            );
            return Duration::from_secs(default_health_check_period());
        }

        Duration::from_secs(self.health_check_period_secs)
    }

    #[must_use]
    pub const fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_millis)
    }

    /// Reject settings that would leave the gateway unable to send anything
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Configuration`] if the throttle has no capacity,
    /// more capacity than a semaphore can hold, or no window.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.throttle_capacity == 0 {
            return Err(DeliveryError::Configuration(
                "throttle_capacity must be at least 1".to_string(),
            ));
        }

        if self.throttle_capacity > Semaphore::MAX_PERMITS {
            return Err(DeliveryError::Configuration(format!(
                "throttle_capacity must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.throttle_window_millis == 0 {
            return Err(DeliveryError::Configuration(
                "throttle_window_millis must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
