//! Record builders and stores shared by the service tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use clientele_core::{
    Customer, CustomerFilter, CustomerId, CustomerPipeline, CustomerWithOrderCount, Email,
    FilterParams, Gender, Order, OrderFilter, OrderId, OrderStatus, PageWindow, RawFilterParams,
    StatusCount,
};

use crate::db::{InMemoryStore, RecordStore, RepositoryError};

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
}

pub fn customer(id: i64) -> Customer {
    Customer {
        id: CustomerId::new(id),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        email: Email::parse(&format!("customer{id}@example.com")).unwrap(),
        age: Some(30),
        gender: if id % 2 == 0 { Gender::Female } else { Gender::Male },
        state: None,
        street_address: None,
        postal_code: None,
        city: None,
        country: Some("Brasil".to_owned()),
        latitude: None,
        longitude: None,
        traffic_source: Some("Search".to_owned()),
        created_at: epoch(),
    }
}

/// Order `order_id` placed `order_id` hours after the epoch.
pub fn order(order_id: i64, user_id: i64, status: OrderStatus) -> Order {
    Order {
        order_id: OrderId::new(order_id),
        user_id: CustomerId::new(user_id),
        status,
        gender: None,
        num_of_item: 1,
        created_at: epoch() + Duration::hours(order_id),
    }
}

/// A store where customer `id` has `counts[id]` orders.
pub fn store_with_counts(counts: &[(i64, u64)]) -> InMemoryStore {
    let mut next_order = 1;
    let mut orders = Vec::new();
    for &(id, count) in counts {
        for _ in 0..count {
            orders.push(order(next_order, id, OrderStatus::Delivered));
            next_order += 1;
        }
    }
    InMemoryStore::new(counts.iter().map(|&(id, _)| customer(id)).collect(), orders)
}

/// Customers 1, 2, 3 with 0, 3 and 0 orders.
pub fn three_customers() -> InMemoryStore {
    store_with_counts(&[(1, 0), (2, 3), (3, 0)])
}

pub fn filter(raw: RawFilterParams<'_>) -> CustomerFilter {
    FilterParams::parse(raw).unwrap().resolve().unwrap()
}

/// A store whose every read fails.
#[derive(Debug, Default)]
pub struct FailingStore;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("connection refused".to_owned()))
}

impl RecordStore for FailingStore {
    async fn find_customers(&self, _: PageWindow) -> Result<Vec<Customer>, RepositoryError> {
        unavailable()
    }

    async fn count_customers(&self) -> Result<u64, RepositoryError> {
        unavailable()
    }

    async fn find_customer(&self, _: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        unavailable()
    }

    async fn find_customers_by_ids(
        &self,
        _: &[CustomerId],
    ) -> Result<Vec<Customer>, RepositoryError> {
        unavailable()
    }

    async fn count_orders_by_customer(
        &self,
        _: &[CustomerId],
    ) -> Result<HashMap<CustomerId, u64>, RepositoryError> {
        unavailable()
    }

    async fn aggregate_customers(
        &self,
        _: &CustomerPipeline,
    ) -> Result<Vec<CustomerWithOrderCount>, RepositoryError> {
        unavailable()
    }

    async fn count_customers_matching(&self, _: &CustomerFilter) -> Result<u64, RepositoryError> {
        unavailable()
    }

    async fn find_orders(&self, _: OrderFilter, _: PageWindow) -> Result<Vec<Order>, RepositoryError> {
        unavailable()
    }

    async fn count_orders(&self, _: OrderFilter) -> Result<u64, RepositoryError> {
        unavailable()
    }

    async fn count_orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        unavailable()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        unavailable()
    }
}
