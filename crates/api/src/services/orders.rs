//! Order listings and analytics.

use std::collections::{BTreeSet, HashMap};

use tracing::instrument;

use clientele_core::{
    CustomerId, CustomerSummary, Order, OrderAnalytics, OrderFilter, OrderPage,
    OrderPaginationInfo, OrderView, PageRequest, PageWindow, RecentOrder, StatusCount,
};

use super::QueryError;
use crate::db::{RecordStore, RepositoryError};

/// Order queries over a record store.
pub struct OrderService<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> OrderService<'a, S> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// List one page of orders, newest first, each with its customer.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::StoreUnavailable` if any store read fails.
    #[instrument(skip(self), fields(page = page.page(), limit = page.limit()))]
    pub async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<OrderPage, QueryError> {
        let (orders, total) = tokio::try_join!(
            self.store.find_orders(filter, page.window()),
            self.store.count_orders(filter),
        )?;

        let summaries = self.customer_summaries(&orders).await?;
        let orders: Vec<OrderView> = orders
            .into_iter()
            .map(|order| OrderView {
                customer: summaries.get(&order.user_id).cloned(),
                order,
            })
            .collect();

        tracing::info!(returned = orders.len(), total, "Listed orders");

        Ok(OrderPage {
            orders,
            pagination: OrderPaginationInfo::new(&page, total),
        })
    }

    /// List one page of a customer's orders.
    ///
    /// An id with no orders yields an empty page, not an error.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::StoreUnavailable` if any store read fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> Result<OrderPage, QueryError> {
        self.list(OrderFilter::for_customer(customer_id), page).await
    }

    /// Totals per status and the most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::StoreUnavailable` if any store read fails.
    #[instrument(skip(self))]
    pub async fn analytics(&self) -> Result<OrderAnalytics, QueryError> {
        let (total_orders, mut status_breakdown, recent) = tokio::try_join!(
            self.store.count_orders(OrderFilter::default()),
            self.store.count_orders_by_status(),
            self.store.find_orders(
                OrderFilter::default(),
                PageWindow::first(OrderAnalytics::RECENT_ORDERS)
            ),
        )?;

        status_breakdown.retain(|entry| entry.count > 0);
        status_breakdown.sort_by(by_count_then_name);

        let summaries = self.customer_summaries(&recent).await?;
        let recent_orders = recent
            .into_iter()
            .map(|order| RecentOrder {
                order_id: order.order_id,
                status: order.status,
                created_at: order.created_at,
                customer_name: summaries
                    .get(&order.user_id)
                    .map(|summary| summary.full_name.clone()),
            })
            .collect();

        Ok(OrderAnalytics {
            total_orders,
            status_breakdown,
            recent_orders,
        })
    }

    /// Summaries of the customers referenced by `orders`, keyed by id.
    async fn customer_summaries(
        &self,
        orders: &[Order],
    ) -> Result<HashMap<CustomerId, CustomerSummary>, RepositoryError> {
        let ids: Vec<CustomerId> = orders
            .iter()
            .map(|order| order.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let customers = self.store.find_customers_by_ids(&ids).await?;
        Ok(customers
            .iter()
            .map(|customer| (customer.id, CustomerSummary::from(customer)))
            .collect())
    }
}

fn by_count_then_name(a: &StatusCount, b: &StatusCount) -> std::cmp::Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| a.status.as_str().cmp(b.status.as_str()))
}
