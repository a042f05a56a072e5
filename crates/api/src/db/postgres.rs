//! `PostgreSQL` record store.
//!
//! The customer listing is pushed down as a single statement: a CTE joins
//! every customer with its grouped order count, filter stages become
//! `WHERE` clauses over the derived column, and `ORDER BY` / `OFFSET` /
//! `LIMIT` come last. The count statement is built from the same CTE and
//! the same filter so selection and total can never disagree.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use clientele_core::{
    Customer, CustomerFilter, CustomerId, CustomerPipeline, CustomerSort, CustomerWithOrderCount,
    Email, Gender, Order, OrderFilter, OrderId, OrderStatus, PageWindow, StatusCount,
};

use super::{RecordStore, RepositoryError};

/// Customer columns in selection order.
const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, age, gender, state, \
     street_address, postal_code, city, country, latitude, longitude, traffic_source, created_at";

const ORDER_COLUMNS: &str = "order_id, user_id, status, gender, num_of_item, created_at";

/// Customers left-joined with their grouped order count.
const COUNTED_CUSTOMERS: &str = "WITH counted AS (\
     SELECT c.*, COALESCE(o.order_count, 0) AS order_count \
     FROM customers c \
     LEFT JOIN (SELECT user_id, COUNT(*) AS order_count FROM orders GROUP BY user_id) o \
     ON o.user_id = c.id) ";

/// Record store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    age: Option<i32>,
    gender: String,
    state: Option<String>,
    street_address: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    traffic_source: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let gender = row.gender.parse::<Gender>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid gender in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            age: row.age,
            gender,
            state: row.state,
            street_address: row.street_address,
            postal_code: row.postal_code,
            city: row.city,
            country: row.country,
            latitude: row.latitude,
            longitude: row.longitude,
            traffic_source: row.traffic_source,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountedCustomerRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    order_count: i64,
}

impl TryFrom<CountedCustomerRow> for CustomerWithOrderCount {
    type Error = RepositoryError;

    fn try_from(row: CountedCustomerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            customer: row.customer.try_into()?,
            order_count: to_count(row.order_count)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: i64,
    user_id: i64,
    status: String,
    gender: Option<String>,
    num_of_item: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid order gender in database: {e}"))
            })?;

        Ok(Self {
            order_id: OrderId::new(row.order_id),
            user_id: CustomerId::new(row.user_id),
            status: parse_status(&row.status)?,
            gender,
            num_of_item: row.num_of_item,
            created_at: row.created_at,
        })
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse::<OrderStatus>().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
    })
}

fn to_count(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative count: {count}")))
}

/// `OFFSET` / `LIMIT` take `BIGINT`; anything larger means "no limit".
fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn raw_ids(ids: &[CustomerId]) -> Vec<i64> {
    ids.iter().map(CustomerId::as_i64).collect()
}

// =============================================================================
// Statement construction
// =============================================================================

/// Append one `AND` clause per filter stage. Callers start the clause list.
fn push_customer_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    builder.push(" WHERE TRUE");
    for stage in filter.stages() {
        builder
            .push(" AND ")
            .push(stage.field.column())
            .push(" ")
            .push(stage.op.sql())
            .push(" ")
            .push_bind(stage.value);
    }
}

fn push_customer_sort(builder: &mut QueryBuilder<'_, Postgres>, sort: CustomerSort) {
    builder.push(match sort {
        CustomerSort::OrderCountDesc => " ORDER BY order_count DESC, id ASC",
        CustomerSort::IdAsc => " ORDER BY id ASC",
    });
}

fn push_window(builder: &mut QueryBuilder<'_, Postgres>, window: PageWindow) {
    builder
        .push(" OFFSET ")
        .push_bind(to_bigint(window.offset))
        .push(" LIMIT ")
        .push_bind(to_bigint(window.limit));
}

fn push_order_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: OrderFilter) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.as_i64());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

fn aggregate_statement(pipeline: &CustomerPipeline) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(COUNTED_CUSTOMERS);
    builder
        .push("SELECT ")
        .push(CUSTOMER_COLUMNS)
        .push(", order_count FROM counted");
    push_customer_filter(&mut builder, &pipeline.filter);
    push_customer_sort(&mut builder, pipeline.sort);
    if let Some(window) = pipeline.window {
        push_window(&mut builder, window);
    }
    builder
}

fn count_matching_statement(filter: &CustomerFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(COUNTED_CUSTOMERS);
    builder.push("SELECT COUNT(*) FROM counted");
    push_customer_filter(&mut builder, filter);
    builder
}

fn find_orders_statement(filter: OrderFilter, window: PageWindow) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder.push(ORDER_COLUMNS).push(" FROM orders");
    push_order_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, order_id DESC");
    push_window(&mut builder, window);
    builder
}

fn count_orders_statement(filter: OrderFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_order_filter(&mut builder, filter);
    builder
}

// =============================================================================
// Store
// =============================================================================

impl RecordStore for PgRecordStore {
    #[instrument(skip(self))]
    async fn find_customers(&self, window: PageWindow) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id ASC OFFSET $1 LIMIT $2"
        ))
        .bind(to_bigint(window.offset))
        .bind(to_bigint(window.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn count_customers(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        to_count(count)
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    async fn find_customers_by_ids(
        &self,
        ids: &[CustomerId],
    ) -> Result<Vec<Customer>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ANY($1)"
        ))
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    async fn count_orders_by_customer(
        &self,
        ids: &[CustomerId],
    ) -> Result<HashMap<CustomerId, u64>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r"
            SELECT user_id, COUNT(*)
            FROM orders
            WHERE user_id = ANY($1)
            GROUP BY user_id
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, count)| Ok((CustomerId::new(user_id), to_count(count)?)))
            .collect()
    }

    #[instrument(skip(self, pipeline), fields(stages = pipeline.filter.stages().len(), sort = ?pipeline.sort))]
    async fn aggregate_customers(
        &self,
        pipeline: &CustomerPipeline,
    ) -> Result<Vec<CustomerWithOrderCount>, RepositoryError> {
        let rows = aggregate_statement(pipeline)
            .build_query_as::<CountedCustomerRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(CustomerWithOrderCount::try_from)
            .collect()
    }

    #[instrument(skip(self, filter), fields(stages = filter.stages().len()))]
    async fn count_customers_matching(
        &self,
        filter: &CustomerFilter,
    ) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = count_matching_statement(filter)
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;
        to_count(count)
    }

    #[instrument(skip(self))]
    async fn find_orders(
        &self,
        filter: OrderFilter,
        window: PageWindow,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = find_orders_statement(filter, window)
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn count_orders(&self, filter: OrderFilter) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = count_orders_statement(filter)
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;
        to_count(count)
    }

    #[instrument(skip(self))]
    async fn count_orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(status, count)| {
                Ok(StatusCount {
                    status: parse_status(&status)?,
                    count: to_count(count)?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clientele_core::{FilterParams, PageLimits, PageRequest, RawFilterParams};

    use super::*;

    fn filter(raw: RawFilterParams<'_>) -> CustomerFilter {
        FilterParams::parse(raw).unwrap().resolve().unwrap()
    }

    #[test]
    fn test_aggregate_statement_filters_then_sorts_then_windows() {
        let pipeline = CustomerPipeline {
            filter: filter(RawFilterParams {
                min_orders: Some("2"),
                max_orders: Some("5"),
                ..RawFilterParams::default()
            }),
            sort: CustomerSort::OrderCountDesc,
            window: Some(PageRequest::new(2, 10, PageLimits::default()).window()),
        };
        let builder = aggregate_statement(&pipeline);
        let sql = builder.sql();

        assert!(sql.starts_with("WITH counted AS ("));
        assert!(sql.contains("LEFT JOIN (SELECT user_id, COUNT(*) AS order_count"));
        assert!(sql.ends_with(
            "FROM counted WHERE TRUE AND order_count >= $1 AND order_count <= $2 \
             ORDER BY order_count DESC, id ASC OFFSET $3 LIMIT $4"
        ));
    }

    #[test]
    fn test_count_statement_shares_filter_construction() {
        let has_orders = filter(RawFilterParams {
            has_orders: Some("false"),
            ..RawFilterParams::default()
        });
        let count = count_matching_statement(&has_orders);
        let select = aggregate_statement(&CustomerPipeline {
            filter: has_orders,
            sort: CustomerSort::IdAsc,
            window: None,
        });

        assert!(count.sql().ends_with("SELECT COUNT(*) FROM counted WHERE TRUE AND order_count = $1"));
        assert!(select.sql().ends_with("FROM counted WHERE TRUE AND order_count = $1 ORDER BY id ASC"));
    }

    #[test]
    fn test_unfiltered_aggregate_has_no_conditions() {
        let builder = aggregate_statement(&CustomerPipeline::default());
        assert!(builder.sql().ends_with("FROM counted WHERE TRUE ORDER BY order_count DESC, id ASC"));
    }

    #[test]
    fn test_order_statements() {
        let filter = OrderFilter {
            user_id: Some(CustomerId::new(457)),
            status: Some(OrderStatus::Shipped),
        };
        let find = find_orders_statement(filter, PageWindow::first(5));
        assert_eq!(
            find.sql(),
            "SELECT order_id, user_id, status, gender, num_of_item, created_at FROM orders \
             WHERE TRUE AND user_id = $1 AND status = $2 \
             ORDER BY created_at DESC, order_id DESC OFFSET $3 LIMIT $4"
        );
        assert_eq!(
            count_orders_statement(OrderFilter::default()).sql(),
            "SELECT COUNT(*) FROM orders WHERE TRUE"
        );
    }

    #[test]
    fn test_bigint_saturates() {
        assert_eq!(to_bigint(PageWindow::ALL.limit), i64::MAX);
        assert_eq!(to_bigint(20), 20);
    }

    #[test]
    fn test_row_conversion_rejects_bad_data() {
        let row = OrderRow {
            order_id: 8,
            user_id: 457,
            status: "Lost".to_owned(),
            gender: Some("M".to_owned()),
            num_of_item: 1,
            created_at: Utc::now(),
        };
        assert!(matches!(
            Order::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(to_count(-1).is_err());
    }
}
