//! Record store access.
//!
//! # Collections
//!
//! - `customers` - Customer records (read-only to this service)
//! - `orders` - Order records, `user_id` referencing `customers.id` logically
//!
//! The service never writes to either collection. [`RecordStore`] is the
//! typed rendition of the find / count / group-by / aggregate operations
//! the listing engine needs; [`PgRecordStore`] answers them with
//! `PostgreSQL`, [`InMemoryStore`] with plain vectors.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p clientele-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use clientele_core::{
    Customer, CustomerFilter, CustomerId, CustomerPipeline, CustomerWithOrderCount, Order,
    OrderFilter, PageWindow, StatusCount,
};

pub use memory::InMemoryStore;
pub use postgres::PgRecordStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the customer and order collections.
///
/// Every method is a pure read. Implementations must evaluate filters,
/// sort orders and windows exactly as [`CustomerPipeline`] describes them,
/// so that the listing engine gets identical results from any store.
pub trait RecordStore: Send + Sync + 'static {
    /// Customers sorted by `id` ascending, restricted to `window`.
    fn find_customers(
        &self,
        window: PageWindow,
    ) -> impl Future<Output = Result<Vec<Customer>, RepositoryError>> + Send;

    /// Size of the customer collection.
    fn count_customers(&self) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// One customer by id.
    fn find_customer(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Customers whose id is in `ids`, in no particular order.
    fn find_customers_by_ids(
        &self,
        ids: &[CustomerId],
    ) -> impl Future<Output = Result<Vec<Customer>, RepositoryError>> + Send;

    /// Orders grouped by `user_id` and counted, restricted to `ids`.
    ///
    /// Customers without orders are absent from the map.
    fn count_orders_by_customer(
        &self,
        ids: &[CustomerId],
    ) -> impl Future<Output = Result<HashMap<CustomerId, u64>, RepositoryError>> + Send;

    /// Join customers with their order counts and run `pipeline` over the
    /// result (filter stages, then sort, then window).
    fn aggregate_customers(
        &self,
        pipeline: &CustomerPipeline,
    ) -> impl Future<Output = Result<Vec<CustomerWithOrderCount>, RepositoryError>> + Send;

    /// Number of joined customers that pass `filter`.
    fn count_customers_matching(
        &self,
        filter: &CustomerFilter,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Orders matching `filter`, newest first, restricted to `window`.
    fn find_orders(
        &self,
        filter: OrderFilter,
        window: PageWindow,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Number of orders matching `filter`.
    fn count_orders(
        &self,
        filter: OrderFilter,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Orders grouped by status and counted. Statuses without orders are omitted.
    fn count_orders_by_status(
        &self,
    ) -> impl Future<Output = Result<Vec<StatusCount>, RepositoryError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
