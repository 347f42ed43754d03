//! HTTP endpoints for the maelstrom gateway
//!
//! # Endpoints
//!
//! - **`POST /messages?password=...`** - Send the JSON message in the body.
//!   The response status is the chosen provider's status, or the reason the
//!   message was refused.
//! - **`GET /status`** - Last known health of every provider, by name
//! - **`GET /health/live`** - Liveness probe: 200 while the process is serving
//! - **`GET /health/ready`** - Readiness probe: 200 while at least one
//!   provider is healthy
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use maelstrom_api::{ApiConfig, ApiServer};
//! use maelstrom_delivery::Dispatcher;
//!
//! # async fn example(dispatcher: Arc<Dispatcher>) -> Result<(), Box<dyn std::error::Error>> {
//! let server = ApiServer::new(ApiConfig::default(), dispatcher).await?;
//!
//! // Run until a shutdown signal arrives
//! // server.serve(shutdown_receiver).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handlers;
mod server;

pub use config::ApiConfig;
pub use error::ApiError;
pub use handlers::ReadinessStatus;
pub use server::{ApiServer, router};
