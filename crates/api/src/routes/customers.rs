//! Customer route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use clientele_core::{
    CustomerDetail, CustomerId, CustomerListQuery, CustomerPage, CustomerSort, FilterParams,
    PageLimits, PageRequest, RawFilterParams, SortError,
};

use super::QueryMap;
use crate::db::RecordStore;
use crate::error::Result;
use crate::response::ApiResponse;
use crate::services::{CustomerService, QueryError};
use crate::state::AppState;

/// Customer listing query parameters.
///
/// Every field arrives as a raw string: pagination values are sanitized,
/// filter values are validated, and neither is rejected by the extractor.
#[derive(Debug, Default)]
pub struct ListCustomersParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub order_count: Option<String>,
    pub min_orders: Option<String>,
    pub max_orders: Option<String>,
    pub has_orders: Option<String>,
    pub sort: Option<String>,
    /// Accepted for compatibility; no search is performed.
    pub search: Option<String>,
}

impl From<QueryMap> for ListCustomersParams {
    fn from(mut query: QueryMap) -> Self {
        Self {
            page: query.remove("page"),
            limit: query.remove("limit"),
            order_count: query.remove("orderCount"),
            min_orders: query.remove("minOrders"),
            max_orders: query.remove("maxOrders"),
            has_orders: query.remove("hasOrders"),
            sort: query.remove("sort"),
            search: query.remove("search"),
        }
    }
}

impl ListCustomersParams {
    /// Turn the raw parameters into a listing query.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidFilter` for malformed or combined
    /// order-count filters, `QueryError::InvalidParameter` for an unknown sort.
    pub fn to_query(&self, limits: PageLimits) -> std::result::Result<CustomerListQuery, QueryError> {
        let filter = FilterParams::parse(RawFilterParams {
            order_count: self.order_count.as_deref(),
            min_orders: self.min_orders.as_deref(),
            max_orders: self.max_orders.as_deref(),
            has_orders: self.has_orders.as_deref(),
        })?
        .resolve()?;
        let sort = CustomerSort::parse(self.sort.as_deref())
            .map_err(|SortError(value)| QueryError::invalid_parameter("sort", value))?;

        Ok(CustomerListQuery {
            page: PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref(), limits),
            filter,
            sort,
        })
    }
}

/// Parse a customer id path segment.
pub(super) fn parse_customer_id(raw: &str) -> std::result::Result<CustomerId, QueryError> {
    raw.parse()
        .map_err(|_| QueryError::invalid_parameter("customer id", raw))
}

/// `GET /api/customers`
#[instrument(skip(state))]
pub async fn index<S: RecordStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<QueryMap>,
) -> Result<Json<ApiResponse<CustomerPage>>> {
    let query = ListCustomersParams::from(query).to_query(state.page_limits())?;
    let page = CustomerService::new(state.store()).list(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/customers/{id}`
#[instrument(skip(state))]
pub async fn show<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CustomerDetail>>> {
    let id = parse_customer_id(&id)?;
    let detail = CustomerService::new(state.store()).get(id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}
