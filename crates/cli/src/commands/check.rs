//! Record store check command.
//!
//! Connects with the API's configuration, pings the store and reports the
//! size of both collections along with the per-status order breakdown.

use clientele_api::db::{PgRecordStore, RecordStore};
use clientele_api::services::OrderService;

use super::{CommandError, connect};

/// Check connectivity and report collection sizes.
///
/// # Errors
///
/// Returns an error if configuration is missing or any store read fails.
pub async fn run() -> Result<(), CommandError> {
    let store = PgRecordStore::new(connect().await?);
    store.ping().await?;
    tracing::info!("Record store reachable");

    let customers = store.count_customers().await?;
    let analytics = OrderService::new(&store).analytics().await?;

    tracing::info!(customers, orders = analytics.total_orders, "Collection sizes");
    for entry in &analytics.status_breakdown {
        tracing::info!(status = %entry.status, count = entry.count, "Orders by status");
    }

    Ok(())
}
