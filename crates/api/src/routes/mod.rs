//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Liveness check
//! GET  /health/ready                     - Readiness check (pings the store)
//!
//! # Customers
//! GET  /api/customers                    - Customer listing with order counts
//! GET  /api/customers/{id}               - Customer detail with orders
//!
//! # Orders
//! GET  /api/orders                       - Order listing
//! GET  /api/orders/analytics             - Status breakdown and recent orders
//! GET  /api/orders/customer/{customer_id} - One customer's orders
//! ```
//!
//! Every JSON body is wrapped in [`ApiResponse`](crate::response::ApiResponse).

pub mod customers;
pub mod health;
pub mod orders;

use std::collections::HashMap;

use axum::{Router, routing::get};

use crate::db::RecordStore;
use crate::state::AppState;

/// Query string as a flat map. A repeated key keeps its last value, so a
/// query string can never be rejected by the extractor itself.
pub type QueryMap = HashMap<String, String>;

/// Create the customer routes router.
pub fn customer_routes<S: RecordStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(customers::index::<S>))
        .route("/{id}", get(customers::show::<S>))
}

/// Create the order routes router.
pub fn order_routes<S: RecordStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>))
        .route("/analytics", get(orders::analytics::<S>))
        .route("/customer/{customer_id}", get(orders::by_customer::<S>))
}

/// Create all routes for the API.
pub fn routes<S: RecordStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .nest("/api/customers", customer_routes())
        .nest("/api/orders", order_routes())
}
