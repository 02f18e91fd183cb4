//! HTTP side: the signed interactions endpoint and a health probe.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use weinbot_sdk::interaction;
use weinbot_sdk::signature::{HEADER_SIGNATURE, HEADER_TIMESTAMP, Verifier};

use crate::bot::Bot;
use crate::order::OrderStatus;
use crate::platform::Platform;

pub struct AppState<P: Platform> {
    pub bot: Arc<Bot<P>>,
    pub verifier: Verifier,
}

pub fn router<P: Platform>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/interactions", post(interactions::<P>))
        .route("/health", get(health::<P>))
        .with_state(state)
}

// ── Handlers ───────────────────────────────────────────────────────────

async fn interactions<P: Platform>(
    State(state): State<Arc<AppState<P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(signature), Some(timestamp)) = (
        header(&headers, HEADER_SIGNATURE),
        header(&headers, HEADER_TIMESTAMP),
    ) else {
        tracing::debug!("Interaction without signature headers");
        return (StatusCode::UNAUTHORIZED, "missing signature").into_response();
    };
    if let Err(e) = state.verifier.verify(signature, timestamp, &body) {
        tracing::warn!(error = %e, "Rejected interaction signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let event = match interaction::decode(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Undecodable interaction");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    Json(state.bot.handle(event).await).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn health<P: Platform>(State(state): State<Arc<AppState<P>>>) -> Response {
    match state.bot.store().count_by_status(OrderStatus::Pending) {
        Ok(pending) => Json(serde_json::json!({
            "status": "ok",
            "pending_orders": pending,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "error" })),
            )
                .into_response()
        }
    }
}
