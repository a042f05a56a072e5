//! Integration tests for Clientele.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no database, no server)
//! cargo test -p clientele-integration-tests
//!
//! # Live-server tests against a running API
//! CLIENTELE_BASE_URL=http://localhost:5550 \
//!     cargo test -p clientele-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `customers_api` - Customer listing and lookup over HTTP
//! - `orders_api` - Order listing and analytics over HTTP
//! - `health` - Health checks, request ids, store failures
//! - `live_server` - Smoke tests against a running server (ignored by default)
//!
//! In-process tests build the full router over [`sample_store`] and drive
//! it with `tower::ServiceExt::oneshot`.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::missing_panics_doc)]

use std::collections::HashMap;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use clientele_api::db::{InMemoryStore, RecordStore, RepositoryError};
use clientele_api::state::AppState;
use clientele_core::{
    Customer, CustomerFilter, CustomerId, CustomerPipeline, CustomerWithOrderCount, Email, Gender,
    Order, OrderFilter, OrderId, OrderStatus, PageLimits, PageWindow, StatusCount,
};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap()
}

/// A customer with `first.last@example.com` as email.
#[must_use]
pub fn customer(id: i64, first_name: &str, last_name: &str, gender: Gender) -> Customer {
    Customer {
        id: CustomerId::new(id),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: Email::parse(&format!(
            "{}.{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ))
        .unwrap(),
        age: Some(34),
        gender,
        state: Some("São Paulo".to_string()),
        street_address: None,
        postal_code: None,
        city: Some("São Paulo".to_string()),
        country: Some("Brasil".to_string()),
        latitude: Some(-23.55),
        longitude: Some(-46.63),
        traffic_source: Some("Search".to_string()),
        created_at: at(2022, 1, 15),
    }
}

/// A single-item order.
#[must_use]
pub fn order(order_id: i64, user_id: i64, status: OrderStatus, created_at: DateTime<Utc>) -> Order {
    Order {
        order_id: OrderId::new(order_id),
        user_id: CustomerId::new(user_id),
        status,
        gender: None,
        num_of_item: 1,
        created_at,
    }
}

/// Five customers and six orders.
///
/// | customer | name         | orders      |
/// |----------|--------------|-------------|
/// | 457      | Maria Silva  | 8, 9        |
/// | 458      | João Santos  | 10          |
/// | 459      | Ana Costa    | 11, 12, 13  |
/// | 460      | Pedro Lima   | none        |
/// | 461      | Lucia Alves  | none        |
///
/// Orders from newest to oldest: 12, 11, 13, 9, 8, 10.
#[must_use]
pub fn sample_store() -> InMemoryStore {
    InMemoryStore::new(sample_customers(), sample_orders())
}

/// Customers of [`sample_store`].
#[must_use]
pub fn sample_customers() -> Vec<Customer> {
    vec![
        customer(457, "Maria", "Silva", Gender::Female),
        customer(458, "João", "Santos", Gender::Male),
        customer(459, "Ana", "Costa", Gender::Female),
        customer(460, "Pedro", "Lima", Gender::Male),
        customer(461, "Lucia", "Alves", Gender::Female),
    ]
}

/// Orders of [`sample_store`].
#[must_use]
pub fn sample_orders() -> Vec<Order> {
    vec![
        order(8, 457, OrderStatus::Delivered, at(2022, 10, 20)),
        order(9, 457, OrderStatus::Shipped, at(2022, 11, 2)),
        order(10, 458, OrderStatus::Cancelled, at(2022, 9, 14)),
        order(11, 459, OrderStatus::Shipped, at(2023, 1, 5)),
        order(12, 459, OrderStatus::Processing, at(2023, 1, 7)),
        order(13, 459, OrderStatus::Delivered, at(2022, 12, 11)),
    ]
}

/// A larger record set: `customers` customers with ids `1..=customers`,
/// customer `id` placing `id % 5` orders, plus two orders for customer 9999
/// who does not exist.
///
/// Order timestamps repeat every 7 orders so newest-first listings have to
/// fall back to the `order_id` tie-break.
#[must_use]
pub fn generated_records(customers: i64) -> (Vec<Customer>, Vec<Order>) {
    let people: Vec<Customer> = (1..=customers)
        .map(|id| {
            let gender = if id % 2 == 0 { Gender::Male } else { Gender::Female };
            customer(id, "Customer", &format!("N{id}"), gender)
        })
        .collect();

    let mut order_id = 0;
    let mut orders = Vec::new();
    let owners = (1..=customers)
        .flat_map(|id| std::iter::repeat_n(id, usize::try_from(id % 5).unwrap()))
        .chain([9999, 9999]);
    for user_id in owners {
        order_id += 1;
        let status = OrderStatus::ALL[usize::try_from(order_id % 5).unwrap()];
        let day = u32::try_from(order_id % 7).unwrap() + 1;
        orders.push(order(order_id, user_id, status, at(2023, 3, day)));
    }

    (people, orders)
}

/// The full application router over `store` with default page limits.
pub fn test_app<S: RecordStore>(store: S) -> Router {
    clientele_api::app(AppState::new(store, PageLimits::default()))
}

/// A response as seen by a test.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send `GET uri` through `app` and decode the JSON body.
///
/// Non-JSON bodies (such as the plain `ok` of `/health`) decode as a JSON string.
pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Integer ids found under `key` in each element of `items`.
#[must_use]
pub fn ids(items: &Value, key: &str) -> Vec<i64> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item[key].as_i64().unwrap())
        .collect()
}

/// A record store that cannot be reached.
#[derive(Debug, Default)]
pub struct UnreachableStore;

fn connection_refused<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable(
        "connection refused (postgres://clientele:secret@db/clientele)".to_string(),
    ))
}

impl RecordStore for UnreachableStore {
    async fn find_customers(&self, _: PageWindow) -> Result<Vec<Customer>, RepositoryError> {
        connection_refused()
    }

    async fn count_customers(&self) -> Result<u64, RepositoryError> {
        connection_refused()
    }

    async fn find_customer(&self, _: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        connection_refused()
    }

    async fn find_customers_by_ids(
        &self,
        _: &[CustomerId],
    ) -> Result<Vec<Customer>, RepositoryError> {
        connection_refused()
    }

    async fn count_orders_by_customer(
        &self,
        _: &[CustomerId],
    ) -> Result<HashMap<CustomerId, u64>, RepositoryError> {
        connection_refused()
    }

    async fn aggregate_customers(
        &self,
        _: &CustomerPipeline,
    ) -> Result<Vec<CustomerWithOrderCount>, RepositoryError> {
        connection_refused()
    }

    async fn count_customers_matching(&self, _: &CustomerFilter) -> Result<u64, RepositoryError> {
        connection_refused()
    }

    async fn find_orders(&self, _: OrderFilter, _: PageWindow) -> Result<Vec<Order>, RepositoryError> {
        connection_refused()
    }

    async fn count_orders(&self, _: OrderFilter) -> Result<u64, RepositoryError> {
        connection_refused()
    }

    async fn count_orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        connection_refused()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        connection_refused()
    }
}
