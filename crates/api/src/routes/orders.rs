//! Order route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use clientele_core::{
    OrderAnalytics, OrderFilter, OrderPage, OrderStatus, PageLimits, PageRequest,
};

use super::QueryMap;
use super::customers::parse_customer_id;
use crate::db::RecordStore;
use crate::error::Result;
use crate::response::ApiResponse;
use crate::services::{OrderService, QueryError};
use crate::state::AppState;

/// Order listing query parameters.
#[derive(Debug, Default)]
pub struct ListOrdersParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

impl From<QueryMap> for ListOrdersParams {
    fn from(mut query: QueryMap) -> Self {
        Self {
            page: query.remove("page"),
            limit: query.remove("limit"),
            status: query.remove("status"),
        }
    }
}

impl ListOrdersParams {
    fn page(&self, limits: PageLimits) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref(), limits)
    }

    /// Status filter; blank means "any status".
    fn status(&self) -> std::result::Result<Option<OrderStatus>, QueryError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| QueryError::invalid_parameter("status", raw)),
        }
    }
}

/// `GET /api/orders`
#[instrument(skip(state))]
pub async fn index<S: RecordStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<QueryMap>,
) -> Result<Json<ApiResponse<OrderPage>>> {
    let params = ListOrdersParams::from(query);
    let filter = OrderFilter {
        user_id: None,
        status: params.status()?,
    };
    let page = OrderService::new(state.store())
        .list(filter, params.page(state.page_limits()))
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/orders/customer/{customer_id}`
#[instrument(skip(state))]
pub async fn by_customer<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(customer_id): Path<String>,
    Query(query): Query<QueryMap>,
) -> Result<Json<ApiResponse<OrderPage>>> {
    let customer_id = parse_customer_id(&customer_id)?;
    let params = ListOrdersParams::from(query);
    let page = OrderService::new(state.store())
        .list_for_customer(customer_id, params.page(state.page_limits()))
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/orders/analytics`
#[instrument(skip(state))]
pub async fn analytics<S: RecordStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<ApiResponse<OrderAnalytics>>> {
    let analytics = OrderService::new(state.store()).analytics().await?;
    Ok(Json(ApiResponse::ok(analytics)))
}
