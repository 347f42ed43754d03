//! The core of the maelstrom gateway: picking a healthy provider and handing
//! it a message.
//!
//! - [`Registry`] holds every configured [`Provider`] and its last known health
//! - [`HealthMonitor`] refreshes that health in the background
//! - [`Throttle`] bounds how many sends are admitted per window
//! - [`Dispatcher`] validates, selects, admits and forwards a single message

mod auth;
mod config;
pub mod credentials;
mod dispatcher;
mod error;
mod monitor;
pub mod provider;
mod registry;
mod throttle;

pub use auth::SharedSecret;
pub use config::{DeliveryConfig, ProviderConfig, ProviderTimeouts};
pub use credentials::{CredentialResolver, CredentialSource, MetadataConfig};
pub use dispatcher::Dispatcher;
pub use error::{DeliveryError, DispatchError};
pub use monitor::{HealthMonitor, MonitorState};
pub use provider::{Provider, ProviderKind};
pub use registry::Registry;
pub use throttle::{Throttle, ThrottleStats};
