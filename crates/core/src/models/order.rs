//! Order records, views and analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::customer::CustomerSummary;
use crate::query::OrderPaginationInfo;
use crate::types::{CustomerId, Gender, OrderId, OrderStatus};

/// An order record as held by the record store.
///
/// `user_id` references [`crate::Customer::id`] logically only; nothing
/// guarantees the customer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: CustomerId,
    pub status: OrderStatus,
    pub gender: Option<Gender>,
    /// Number of items, always >= 1.
    pub num_of_item: i32,
    pub created_at: DateTime<Utc>,
}

/// Order annotated with the customer that placed it, when that customer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<CustomerSummary>,
}

/// One page of an order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderView>,
    pub pagination: OrderPaginationInfo,
}

/// Number of orders in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Entry of the recent-orders feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
}

/// Order summary across the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnalytics {
    pub total_orders: u64,
    pub status_breakdown: Vec<StatusCount>,
    pub recent_orders: Vec<RecentOrder>,
}

impl OrderAnalytics {
    /// Number of entries in the recent-orders feed.
    pub const RECENT_ORDERS: u64 = 5;
}
