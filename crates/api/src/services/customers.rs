//! Customer listing engine.
//!
//! A listing is answered by one of two strategies:
//!
//! 1. [`ListingStrategy::JoinFilterPaginate`]: the store joins customers
//!    with their order counts, runs the filter stages over the derived
//!    count, sorts and windows. The total is counted by the same join and
//!    the same filter. Correct for every query.
//! 2. [`ListingStrategy::PaginateThenEnrich`]: customers are windowed by
//!    id, the collection is counted, and orders are group-counted only for
//!    the ids on the page. Correct only without filters and with `sort=id`.
//!
//! In both cases the page read and the total read are independent and are
//! issued concurrently.

use std::time::Instant;

use tracing::instrument;

use clientele_core::{
    CustomerDetail, CustomerId, CustomerListQuery, CustomerPage, CustomerSort, CustomerView,
    FiltersInfo, OrderFilter, PageWindow, PaginationInfo,
};

use super::QueryError;
use crate::db::{RecordStore, RepositoryError};

/// How a customer listing is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStrategy {
    /// Join, count, filter, sort, then window.
    JoinFilterPaginate,
    /// Window customers by id, then count orders for the page only.
    PaginateThenEnrich,
}

impl ListingStrategy {
    /// The strategy the engine uses for `query`.
    #[must_use]
    pub fn for_query(query: &CustomerListQuery) -> Self {
        if Self::PaginateThenEnrich.supports(query) {
            Self::PaginateThenEnrich
        } else {
            Self::JoinFilterPaginate
        }
    }

    /// Whether this strategy computes `query` correctly.
    #[must_use]
    pub fn supports(self, query: &CustomerListQuery) -> bool {
        match self {
            Self::JoinFilterPaginate => true,
            Self::PaginateThenEnrich => {
                query.filter.is_empty() && query.sort == CustomerSort::IdAsc
            }
        }
    }
}

/// Customer queries over a record store.
pub struct CustomerService<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> CustomerService<'a, S> {
    /// Create a new customer service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// List one page of customers with their order counts.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::StoreUnavailable` if any store read fails.
    #[instrument(skip(self, query), fields(page = query.page.page(), limit = query.page.limit()))]
    pub async fn list(&self, query: &CustomerListQuery) -> Result<CustomerPage, QueryError> {
        self.list_with(ListingStrategy::for_query(query), query)
            .await
    }

    /// List one page of customers using an explicit strategy.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::StrategyNotApplicable` if `strategy` cannot
    /// answer `query`, `QueryError::StoreUnavailable` if any store read fails.
    pub async fn list_with(
        &self,
        strategy: ListingStrategy,
        query: &CustomerListQuery,
    ) -> Result<CustomerPage, QueryError> {
        if !strategy.supports(query) {
            return Err(QueryError::StrategyNotApplicable(strategy));
        }

        let started = Instant::now();
        let (customers, total) = match strategy {
            ListingStrategy::JoinFilterPaginate => self.join_filter_paginate(query).await?,
            ListingStrategy::PaginateThenEnrich => self.paginate_then_enrich(query).await?,
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            ?strategy,
            returned = customers.len(),
            total,
            elapsed_ms,
            "Listed customers"
        );

        Ok(CustomerPage {
            customers,
            pagination: PaginationInfo::new(&query.page, total),
            filters: FiltersInfo {
                applied: *query.filter.applied(),
            },
        })
    }

    async fn join_filter_paginate(
        &self,
        query: &CustomerListQuery,
    ) -> Result<(Vec<CustomerView>, u64), RepositoryError> {
        let pipeline = query.pipeline();
        let (rows, total) = tokio::try_join!(
            self.store.aggregate_customers(&pipeline),
            self.store.count_customers_matching(&query.filter),
        )?;

        Ok((rows.into_iter().map(CustomerView::from).collect(), total))
    }

    async fn paginate_then_enrich(
        &self,
        query: &CustomerListQuery,
    ) -> Result<(Vec<CustomerView>, u64), RepositoryError> {
        let (customers, total) = tokio::try_join!(
            self.store.find_customers(query.page.window()),
            self.store.count_customers(),
        )?;

        let ids: Vec<CustomerId> = customers.iter().map(|customer| customer.id).collect();
        let counts = self.store.count_orders_by_customer(&ids).await?;

        let views = customers
            .iter()
            .map(|customer| {
                CustomerView::new(customer, counts.get(&customer.id).copied().unwrap_or(0))
            })
            .collect();
        Ok((views, total))
    }

    /// Get one customer with every order it placed, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NotFound` if no customer has this id,
    /// `QueryError::StoreUnavailable` if any store read fails.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn get(&self, id: CustomerId) -> Result<CustomerDetail, QueryError> {
        let (customer, orders) = tokio::try_join!(
            self.store.find_customer(id),
            self.store
                .find_orders(OrderFilter::for_customer(id), PageWindow::ALL),
        )?;

        let customer = customer.ok_or_else(|| QueryError::NotFound(format!("Customer {id}")))?;
        Ok(CustomerDetail {
            customer: CustomerView::new(&customer, orders.len() as u64),
            orders,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use clientele_core::{
        CustomerFilter, DerivedValues, OrderStatus, PageLimits, PageRequest, RawFilterParams,
    };

    use super::*;
    use crate::db::InMemoryStore;
    use crate::services::testing::{
        FailingStore, customer, filter, order, store_with_counts, three_customers,
    };

    fn query(page: u64, limit: u64, filter: CustomerFilter) -> CustomerListQuery {
        CustomerListQuery {
            page: PageRequest::new(page, limit, PageLimits::default()),
            filter,
            sort: CustomerSort::OrderCountDesc,
        }
    }

    fn ids(page: &CustomerPage) -> Vec<i64> {
        page.customers.iter().map(|c| c.id.as_i64()).collect()
    }

    /// 23 customers; customer `i` has `i % 5` orders.
    fn mixed_store() -> InMemoryStore {
        let counts: Vec<(i64, u64)> = (1..=23).map(|i| (i, (i % 5) as u64)).collect();
        store_with_counts(&counts)
    }

    fn sample_filters() -> Vec<CustomerFilter> {
        vec![
            CustomerFilter::all(),
            filter(RawFilterParams {
                has_orders: Some("true"),
                ..RawFilterParams::default()
            }),
            filter(RawFilterParams {
                has_orders: Some("false"),
                ..RawFilterParams::default()
            }),
            filter(RawFilterParams {
                order_count: Some("2"),
                ..RawFilterParams::default()
            }),
            filter(RawFilterParams {
                min_orders: Some("2"),
                max_orders: Some("3"),
                ..RawFilterParams::default()
            }),
            filter(RawFilterParams {
                min_orders: Some("4"),
                ..RawFilterParams::default()
            }),
            filter(RawFilterParams {
                max_orders: Some("1"),
                ..RawFilterParams::default()
            }),
            filter(RawFilterParams {
                order_count: Some("99"),
                ..RawFilterParams::default()
            }),
        ]
    }

    #[tokio::test]
    async fn test_has_orders_false_lists_customers_without_orders() {
        let store = three_customers();
        let page = CustomerService::new(&store)
            .list(&query(
                1,
                10,
                filter(RawFilterParams {
                    has_orders: Some("false"),
                    ..RawFilterParams::default()
                }),
            ))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![1, 3]);
        assert_eq!(page.pagination.total_customers, 2);
        assert_eq!(page.filters.applied.has_orders, Some(false));
    }

    #[tokio::test]
    async fn test_min_orders_lists_only_matching_customer() {
        let store = three_customers();
        let page = CustomerService::new(&store)
            .list(&query(
                1,
                10,
                filter(RawFilterParams {
                    min_orders: Some("1"),
                    ..RawFilterParams::default()
                }),
            ))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![2]);
        assert_eq!(page.customers[0].order_count, 3);
        assert_eq!(page.pagination.total_customers, 1);
    }

    #[tokio::test]
    async fn test_second_page_of_one_is_second_ranked_customer() {
        let store = three_customers();
        let page = CustomerService::new(&store)
            .list(&query(2, 1, CustomerFilter::all()))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![1]);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next_page);
        assert!(page.pagination.has_prev_page);
    }

    #[tokio::test]
    async fn test_pages_partition_filtered_result() {
        let store = mixed_store();
        let service = CustomerService::new(&store);

        for filter in sample_filters() {
            for limit in [1, 3, 7, 10, 100] {
                let first = service.list(&query(1, limit, filter.clone())).await.unwrap();
                let total = first.pagination.total_customers;
                let mut seen = Vec::new();

                for page in 1..=first.pagination.total_pages {
                    let result = service.list(&query(page, limit, filter.clone())).await.unwrap();
                    assert_eq!(result.pagination.total_customers, total);
                    assert!(result.customers.len() as u64 <= limit);
                    for view in &result.customers {
                        assert!(filter.matches(&DerivedValues {
                            order_count: view.order_count
                        }));
                    }
                    seen.extend(ids(&result));
                }

                assert_eq!(seen.len() as u64, total, "filter {filter:?}, limit {limit}");
                let mut unique = seen.clone();
                unique.sort_unstable();
                unique.dedup();
                assert_eq!(unique.len(), seen.len());
            }
        }
    }

    #[tokio::test]
    async fn test_page_is_sorted_by_count_then_id() {
        let store = mixed_store();
        let page = CustomerService::new(&store)
            .list(&query(1, 100, CustomerFilter::all()))
            .await
            .unwrap();

        for pair in page.customers.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.order_count >= b.order_count);
            if a.order_count == b.order_count {
                assert!(a.id < b.id);
            }
        }
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let store = three_customers();
        let page = CustomerService::new(&store)
            .list(&query(4, 1, CustomerFilter::all()))
            .await
            .unwrap();

        assert!(page.customers.is_empty());
        assert!(!page.pagination.has_next_page);
        assert_eq!(page.pagination.total_customers, 3);
    }

    #[tokio::test]
    async fn test_empty_result_has_zero_pages() {
        let store = InMemoryStore::default();
        let page = CustomerService::new(&store)
            .list(&query(1, 10, CustomerFilter::all()))
            .await
            .unwrap();

        assert!(page.customers.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
        assert_eq!(page.pagination.total_customers, 0);
        assert!(!page.pagination.has_next_page);
    }

    #[tokio::test]
    async fn test_listing_is_idempotent() {
        let store = mixed_store();
        let service = CustomerService::new(&store);
        let request = query(
            2,
            4,
            filter(RawFilterParams {
                has_orders: Some("true"),
                ..RawFilterParams::default()
            }),
        );

        let first = service.list(&request).await.unwrap();
        let second = service.list(&request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_strategies_agree_on_unfiltered_id_listing() {
        let store = mixed_store();
        let service = CustomerService::new(&store);

        for limit in [1, 5, 10, 23, 30] {
            for page in 1..=4 {
                let request = CustomerListQuery {
                    page: PageRequest::new(page, limit, PageLimits::default()),
                    filter: CustomerFilter::all(),
                    sort: CustomerSort::IdAsc,
                };
                let joined = service
                    .list_with(ListingStrategy::JoinFilterPaginate, &request)
                    .await
                    .unwrap();
                let enriched = service
                    .list_with(ListingStrategy::PaginateThenEnrich, &request)
                    .await
                    .unwrap();
                assert_eq!(joined, enriched, "page {page}, limit {limit}");
            }
        }
    }

    #[tokio::test]
    async fn test_order_count_is_live_on_both_strategies() {
        let store = store_with_counts(&[(1, 4), (2, 0), (3, 1)]);
        let service = CustomerService::new(&store);
        let request = CustomerListQuery {
            sort: CustomerSort::IdAsc,
            ..CustomerListQuery::default()
        };

        for strategy in [
            ListingStrategy::JoinFilterPaginate,
            ListingStrategy::PaginateThenEnrich,
        ] {
            let page = service.list_with(strategy, &request).await.unwrap();
            let counts: Vec<u64> = page.customers.iter().map(|c| c.order_count).collect();
            assert_eq!(counts, vec![4, 0, 1], "{strategy:?}");
        }
    }

    #[test]
    fn test_strategy_selection() {
        let default = CustomerListQuery::default();
        assert_eq!(
            ListingStrategy::for_query(&default),
            ListingStrategy::JoinFilterPaginate
        );

        let by_id = CustomerListQuery {
            sort: CustomerSort::IdAsc,
            ..CustomerListQuery::default()
        };
        assert_eq!(
            ListingStrategy::for_query(&by_id),
            ListingStrategy::PaginateThenEnrich
        );

        let filtered_by_id = CustomerListQuery {
            filter: filter(RawFilterParams {
                has_orders: Some("true"),
                ..RawFilterParams::default()
            }),
            ..by_id
        };
        assert_eq!(
            ListingStrategy::for_query(&filtered_by_id),
            ListingStrategy::JoinFilterPaginate
        );
    }

    #[tokio::test]
    async fn test_forcing_enrich_on_filtered_query_is_rejected() {
        let store = three_customers();
        let request = query(
            1,
            10,
            filter(RawFilterParams {
                min_orders: Some("1"),
                ..RawFilterParams::default()
            }),
        );
        let result = CustomerService::new(&store)
            .list_with(ListingStrategy::PaginateThenEnrich, &request)
            .await;
        assert!(matches!(
            result,
            Err(QueryError::StrategyNotApplicable(
                ListingStrategy::PaginateThenEnrich
            ))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let service = CustomerService::new(&FailingStore);
        for sort in [CustomerSort::OrderCountDesc, CustomerSort::IdAsc] {
            let request = CustomerListQuery {
                sort,
                ..CustomerListQuery::default()
            };
            assert!(matches!(
                service.list(&request).await,
                Err(QueryError::StoreUnavailable(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_get_returns_customer_with_orders_newest_first() {
        let store = InMemoryStore::new(
            vec![customer(457), customer(458)],
            vec![
                order(8, 457, OrderStatus::Delivered),
                order(9, 457, OrderStatus::Shipped),
                order(10, 458, OrderStatus::Cancelled),
            ],
        );
        let detail = CustomerService::new(&store)
            .get(CustomerId::new(457))
            .await
            .unwrap();

        assert_eq!(detail.customer.order_count, 2);
        assert_eq!(detail.customer.full_name, "First457 Last457");
        let order_ids: Vec<i64> = detail.orders.iter().map(|o| o.order_id.as_i64()).collect();
        assert_eq!(order_ids, vec![9, 8]);
    }

    #[tokio::test]
    async fn test_get_unknown_customer_is_not_found() {
        let store = three_customers();
        let result = CustomerService::new(&store).get(CustomerId::new(999)).await;
        assert!(matches!(result, Err(QueryError::NotFound(_))));
    }
}
