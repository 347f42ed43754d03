//! Route handlers

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use maelstrom_common::{Message, incoming};
use maelstrom_delivery::{Dispatcher, ThrottleStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct SendQuery {
    password: Option<String>,
}

/// Why the gateway is not ready, returned with a 503
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    pub providers: usize,
    pub healthy_providers: usize,
    pub throttle: ThrottleStats,
}

/// Send one message
///
/// The body is parsed here rather than by an extractor so that malformed
/// JSON gets the same plain-text 400 regardless of content type.
pub(crate) async fn send_message(
    State(dispatcher): State<Arc<Dispatcher>>,
    Query(query): Query<SendQuery>,
    body: Bytes,
) -> Response {
    let message: Message = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            incoming!(level = WARN, "Rejected message body: {}", err);
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    incoming!(level = DEBUG, "Send request {}", message);

    match dispatcher
        .send_message(message, query.password.as_deref())
        .await
    {
        Ok(code) => StatusCode::from_u16(code)
            .unwrap_or_else(|_| {
                tracing::error!(code, "Provider returned an invalid status code");
                StatusCode::INTERNAL_SERVER_ERROR
            })
            .into_response(),
        Err(err) => {
            let status =
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            if err.is_temporary() {
                let retry_after = retry_after_secs(dispatcher.throttle().stats().window_millis);
                return (
                    status,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    err.to_string(),
                )
                    .into_response();
            }

            (status, err.to_string()).into_response()
        }
    }
}

/// Whole seconds until a throttle slot frees up, at least one
const fn retry_after_secs(window_millis: u64) -> u64 {
    let secs = window_millis.div_ceil(1000);
    if secs == 0 { 1 } else { secs }
}

/// Provider name to last known health
pub(crate) async fn status(
    State(dispatcher): State<Arc<Dispatcher>>,
) -> Json<BTreeMap<String, bool>> {
    Json(dispatcher.registry().snapshot())
}

/// Liveness probe handler
///
/// Answering at all is proof of life.
pub(crate) async fn liveness() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// Readiness probe handler
///
/// Ready while at least one provider is healthy; otherwise every send would
/// be refused as unavailable.
pub(crate) async fn readiness(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    let registry = dispatcher.registry();
    let healthy_providers = registry.healthy_count();

    if healthy_providers > 0 {
        return (StatusCode::OK, "OK").into_response();
    }

    let status = ReadinessStatus {
        providers: registry.len(),
        healthy_providers,
        throttle: dispatcher.throttle().stats(),
    };

    tracing::warn!(
        providers = status.providers,
        healthy_providers = status.healthy_providers,
        "Readiness probe failed"
    );

    (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
}
