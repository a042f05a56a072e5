//! Record and view models.
//!
//! Records ([`Customer`], [`Order`]) mirror what the record store holds.
//! Views are what the API hands out: a customer view always carries its
//! derived `order_count` and `full_name`.

pub mod customer;
pub mod order;

pub use customer::{
    Customer, CustomerDetail, CustomerPage, CustomerSummary, CustomerView, CustomerWithOrderCount,
    FiltersInfo, full_name,
};
pub use order::{OrderAnalytics, OrderPage, OrderView, Order, RecentOrder, StatusCount};
