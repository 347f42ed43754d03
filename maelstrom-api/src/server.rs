//! HTTP server

use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use maelstrom_common::{Signal, internal};
use maelstrom_delivery::Dispatcher;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{ApiConfig, ApiError, handlers};

/// HTTP server in front of a [`Dispatcher`]
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Bind the listen address and build the router
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn new(config: ApiConfig, dispatcher: Arc<Dispatcher>) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| ApiError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "HTTP server bound successfully"
        );

        Ok(Self {
            listener,
            router: router(dispatcher, config.request_timeout()),
        })
    }

    /// The address actually bound, useful when listening on port 0
    ///
    /// # Errors
    ///
    /// Returns an error if the socket's address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve requests until a shutdown signal is received
    ///
    /// In-flight requests are allowed to finish before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), ApiError> {
        internal!(level = INFO, "HTTP server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                internal!(level = INFO, "HTTP server received shutdown signal");
            })
            .await
            .map_err(|e| ApiError::ServerError(e.to_string()))?;

        internal!(level = INFO, "HTTP server stopped");
        Ok(())
    }
}

/// All gateway routes, with request timeout, tracing and panic recovery
pub fn router(dispatcher: Arc<Dispatcher>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/messages", post(handlers::send_message))
        .route("/messages/", post(handlers::send_message))
        .route("/status", get(handlers::status))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .with_state(dispatcher)
        .layer(CatchPanicLayer::custom(recover_panic))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

/// A panic while handling one request becomes a 500 for that request only
fn recover_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    tracing::error!(panic = %detail, "Request handler panicked");

    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
