//! Clientele API library.
//!
//! Customer and order listings over a read-only record store. Customers are
//! listed with a derived `order_count` that can be filtered and sorted on;
//! pages and totals are always computed under the same filter.
//!
//! This crate provides the HTTP surface as a library, allowing it to be
//! driven in-process by tests and by the `clientele-api` binary alike.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, http::Request};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use db::RecordStore;
use state::AppState;

/// Build the application router with its per-request middleware.
///
/// Sentry layers are added by the binary once the client is initialized.
pub fn app<S: RecordStore>(state: AppState<S>) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    routes::routes()
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
}
