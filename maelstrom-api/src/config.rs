//! HTTP server configuration

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the HTTP endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Address to bind the HTTP server
    ///
    /// Common values:
    /// - `[::]:8123` (IPv6 any address, port 8123)
    /// - `0.0.0.0:8123` (IPv4 any address, port 8123)
    /// - `127.0.0.1:8123` (localhost only, port 8123)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Upper bound on handling a single request (seconds)
    ///
    /// Should exceed the provider send timeout, or slow sends are cut off
    /// before the provider's answer arrives.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "[::]:8123".to_string()
}

const fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Replace the port of `listen_address`, keeping the host
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .listen_address
            .rsplit_once(':')
            .map_or(self.listen_address.as_str(), |(host, _)| host);

        self.listen_address = format!("{host}:{port}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_port_keeps_host() {
        let mut config = ApiConfig::default();
        config.set_port(9000);
        assert_eq!(config.listen_address, "[::]:9000");

        config.listen_address = "127.0.0.1:1".to_string();
        config.set_port(8080);
        assert_eq!(config.listen_address, "127.0.0.1:8080");

        config.listen_address = "localhost".to_string();
        config.set_port(25);
        assert_eq!(config.listen_address, "localhost:25");
    }
}
