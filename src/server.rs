use std::time::Instant;

use axum::{
    body::{Bytes, HttpBody},
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::{any, get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::LogStore;

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
struct AppState {
    store: LogStore,
}

/// Build the full route table. Every route goes through the request
/// logging layer; unmatched methods on known paths get a plain-text 405.
pub fn router(store: LogStore) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/webhook", post(receive_webhook))
        .route("/webhook500", any(webhook_500))
        .route("/logs", get(get_logs))
        .route("/clear_logs", post(clear_logs))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(log_requests))
        .with_state(AppState { store })
}

/// Log method and path on the way in; status, response byte length, and
/// elapsed time on the way out. Responses carry complete bodies, so the
/// body size hint is the exact byte count.
async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    tracing::info!(%method, path, "request started");

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let length = response.body().size_hint().exact().unwrap_or(0);
    tracing::info!(
        %method,
        path,
        status,
        length,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let event: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "rejected webhook body");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    tracing::info!(keys = event.len(), "webhook received");

    match state.store.append(LogStore::today(), &event) {
        Ok(()) => (StatusCode::OK, "Webhook received successfully").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to persist webhook");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to write to file").into_response()
        }
    }
}

/// Fixed failure response, for exercising a sender's error handling.
async fn webhook_500() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Fake Internal Server Error").into_response()
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<NaiveDate>,
}

async fn get_logs(State(state): State<AppState>, Query(query): Query<DateQuery>) -> Response {
    let date = query.date.unwrap_or_else(LogStore::today);
    match state.store.read(date) {
        Ok(events) => Json(events).into_response(),
        Err(StoreError::NotFound(_)) => {
            tracing::debug!(%date, "no log partition for date");
            (StatusCode::NOT_FOUND, "No logs found for the specified date").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, %date, "failed to read logs");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn clear_logs(State(state): State<AppState>, Query(query): Query<DateQuery>) -> Response {
    let Some(date) = query.date else {
        tracing::warn!("clear_logs called without a date parameter");
        return (StatusCode::BAD_REQUEST, "Date parameter is required").into_response();
    };

    match state.store.clear(date) {
        Ok(()) => {
            tracing::info!(%date, "log partition cleared");
            (StatusCode::OK, "Logs cleared successfully").into_response()
        }
        Err(StoreError::NotFound(_)) => {
            tracing::debug!(%date, "no log partition to clear");
            (StatusCode::NOT_FOUND, "No logs found for the specified date").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, %date, "failed to clear logs");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}
