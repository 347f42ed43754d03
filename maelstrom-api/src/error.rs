//! HTTP server error types

use thiserror::Error;

/// Errors that can occur while running the HTTP endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address
    #[error("Failed to bind HTTP server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    /// The server stopped with an error
    #[error("HTTP server error: {0}")]
    ServerError(String),
}
