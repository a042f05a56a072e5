//! In-memory record store.
//!
//! Holds both collections in immutable vectors shared behind an `Arc`.
//! Used for tests and for running the API without a database
//! (`CLIENTELE_STORE=memory`). There is no write path: a store is built
//! once from its records and then only read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use clientele_core::{
    Customer, CustomerFilter, CustomerId, CustomerPipeline, CustomerWithOrderCount, Order,
    OrderFilter, OrderStatus, PageWindow, StatusCount, group_order_counts, newest_first,
};

use super::{RecordStore, RepositoryError};

/// Record store backed by in-process vectors.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<Collections>,
}

#[derive(Debug, Default)]
struct Collections {
    /// Sorted by id ascending.
    customers: Vec<Customer>,
    /// Sorted newest first.
    orders: Vec<Order>,
}

impl InMemoryStore {
    /// Build a store from customer and order records.
    #[must_use]
    pub fn new(mut customers: Vec<Customer>, mut orders: Vec<Order>) -> Self {
        customers.sort_by_key(|customer| customer.id);
        orders.sort_by(newest_first);
        Self {
            collections: Arc::new(Collections { customers, orders }),
        }
    }

    fn joined(&self) -> impl Iterator<Item = CustomerWithOrderCount> + '_ {
        let counts = group_order_counts(&self.collections.orders);
        self.collections
            .customers
            .iter()
            .map(move |customer| CustomerWithOrderCount {
                customer: customer.clone(),
                order_count: counts.get(&customer.id).copied().unwrap_or(0),
            })
    }

    fn orders_matching(&self, filter: OrderFilter) -> impl Iterator<Item = &Order> {
        self.collections
            .orders
            .iter()
            .filter(move |order| filter.matches(order))
    }
}

impl RecordStore for InMemoryStore {
    async fn find_customers(&self, window: PageWindow) -> Result<Vec<Customer>, RepositoryError> {
        Ok(window.apply(self.collections.customers.iter().cloned()))
    }

    async fn count_customers(&self) -> Result<u64, RepositoryError> {
        Ok(self.collections.customers.len() as u64)
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .collections
            .customers
            .iter()
            .find(|customer| customer.id == id)
            .cloned())
    }

    async fn find_customers_by_ids(
        &self,
        ids: &[CustomerId],
    ) -> Result<Vec<Customer>, RepositoryError> {
        let wanted: HashSet<CustomerId> = ids.iter().copied().collect();
        Ok(self
            .collections
            .customers
            .iter()
            .filter(|customer| wanted.contains(&customer.id))
            .cloned()
            .collect())
    }

    async fn count_orders_by_customer(
        &self,
        ids: &[CustomerId],
    ) -> Result<HashMap<CustomerId, u64>, RepositoryError> {
        let wanted: HashSet<CustomerId> = ids.iter().copied().collect();
        Ok(group_order_counts(
            self.collections
                .orders
                .iter()
                .filter(|order| wanted.contains(&order.user_id)),
        ))
    }

    async fn aggregate_customers(
        &self,
        pipeline: &CustomerPipeline,
    ) -> Result<Vec<CustomerWithOrderCount>, RepositoryError> {
        Ok(pipeline.run(self.joined()))
    }

    async fn count_customers_matching(
        &self,
        filter: &CustomerFilter,
    ) -> Result<u64, RepositoryError> {
        let pipeline = CustomerPipeline {
            filter: filter.clone(),
            ..CustomerPipeline::default()
        };
        let rows: Vec<_> = self.joined().collect();
        Ok(pipeline.count(&rows))
    }

    async fn find_orders(
        &self,
        filter: OrderFilter,
        window: PageWindow,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(window.apply(self.orders_matching(filter).cloned()))
    }

    async fn count_orders(&self, filter: OrderFilter) -> Result<u64, RepositoryError> {
        Ok(self.orders_matching(filter).count() as u64)
    }

    async fn count_orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let mut counts: HashMap<OrderStatus, u64> = HashMap::new();
        for order in &self.collections.orders {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
