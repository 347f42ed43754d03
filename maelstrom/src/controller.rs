use std::{fmt, net::SocketAddr, sync::Arc};

use maelstrom_api::{ApiConfig, ApiServer};
use maelstrom_common::{
    Signal, internal,
    logging::{self, LoggingConfig},
};
use maelstrom_delivery::{
    CredentialResolver, CredentialSource, DeliveryConfig, Dispatcher, HealthMonitor, Registry,
    SharedSecret, Throttle,
};
use serde::Deserialize;
use tokio::sync::broadcast;

/// The whole gateway, as described by its configuration file
#[derive(Default, Deserialize)]
pub struct Maelstrom {
    /// Secret callers must pass as `?password=` to send mail
    #[serde(default)]
    password: String,
    #[serde(default)]
    delivery: DeliveryConfig,
    #[serde(default)]
    credentials: CredentialSource,
    #[serde(default)]
    api: ApiConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl fmt::Debug for Maelstrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Maelstrom")
            .field("delivery", &self.delivery)
            .field("credentials", &self.credentials)
            .field("api", &self.api)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

impl Maelstrom {
    /// Replace the configured password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Listen on `port` instead of the configured one
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.api.set_port(port);
        self
    }

    /// Log at DEBUG or finer regardless of the configured level
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.logging.debug = debug;
        self
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub const fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    #[must_use]
    pub const fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Run the gateway until CTRL+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails or the HTTP server stops with an
    /// error.
    pub async fn run(self) -> anyhow::Result<()> {
        self.start().await?.run(shutdown()).await
    }

    /// Bring every component up, without serving yet
    ///
    /// Providers are built and given their credentials, checked once so the
    /// first request sees real health, and then monitored in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, an HTTP client
    /// cannot be built, or the listen address cannot be bound.
    pub async fn start(self) -> anyhow::Result<Gateway> {
        logging::init(&self.logging);
        internal!(level = INFO, "Controller starting");

        self.delivery.validate()?;

        let credentials = CredentialResolver::new(self.credentials)?;
        let secret = credentials
            .shared_secret(SharedSecret::new(self.password))
            .await;
        if secret.is_empty() {
            tracing::warn!("No password configured, every send request will be accepted");
        }

        let registry = Arc::new(
            Registry::from_config(
                &self.delivery.providers,
                &self.delivery.timeouts,
                &credentials,
            )
            .await?,
        );
        if registry.is_empty() {
            tracing::warn!("No providers configured, every send request will be refused");
        }

        let monitor = HealthMonitor::new(
            Arc::clone(&registry),
            self.delivery.health_check_period(),
            self.delivery.timeouts.health_check(),
        );
        monitor.check_all().await;
        internal!(
            level = INFO,
            "{} of {} providers healthy",
            registry.healthy_count(),
            registry.len()
        );
        monitor.start();

        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            Throttle::new(
                self.delivery.throttle_capacity,
                self.delivery.throttle_window(),
            ),
            secret,
            self.delivery.timeouts.send(),
        ));

        let server = ApiServer::new(self.api, dispatcher).await?;

        Ok(Gateway { server, monitor })
    }
}

/// A started gateway: providers are monitored and the listener is bound
pub struct Gateway {
    server: ApiServer,
    monitor: HealthMonitor,
}

impl Gateway {
    /// The bound HTTP address
    ///
    /// # Errors
    ///
    /// Returns an error if the socket's address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.server.local_addr()
    }

    /// Serve until `signal` completes, then drain requests and stop monitoring
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server stops with an error.
    pub async fn run(self, signal: impl Future<Output = ()>) -> anyhow::Result<()> {
        let Self { server, monitor } = self;
        let (sender, receiver) = broadcast::channel(16);

        let serve = server.serve(receiver);
        tokio::pin!(serve);

        let stopped_early = tokio::select! {
            r = &mut serve => Some(r),
            () = signal => None,
        };

        let result = match stopped_early {
            Some(result) => result,
            None => {
                internal!(level = INFO, "Shutting down...");
                if sender.send(Signal::Shutdown).is_err() {
                    tracing::debug!("HTTP server already stopped");
                }
                serve.await
            }
        };

        monitor.stop().await;
        internal!(level = INFO, "Shutdown complete");

        Ok(result?)
    }
}

async fn shutdown() {
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::warn!("Unable to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered");
        }
        () = terminate => {
            internal!("Terminate Signal received");
        }
    }
}
