//! Customer listing pipeline.
//!
//! The listing is "filter after aggregate": customers are joined with their
//! order counts, filter stages run over the derived values, the survivors
//! are sorted into a total order, and only then is the page window taken.
//! Windowing before filtering would produce under-filled pages.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{CustomerWithOrderCount, Order};
use crate::query::filter::{CustomerFilter, DerivedValues};
use crate::query::pagination::{PageRequest, PageWindow};
use crate::types::CustomerId;

/// Error raised for an unknown sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sort key: {0:?} (expected \"order_count\" or \"id\")")]
pub struct SortError(pub String);

/// Total order of a customer listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CustomerSort {
    /// `order_count` descending, ties broken by `id` ascending.
    #[default]
    OrderCountDesc,
    /// `id` ascending.
    IdAsc,
}

impl CustomerSort {
    /// Parse the `sort` query parameter. Missing or blank means the default.
    ///
    /// # Errors
    ///
    /// Returns `SortError` for anything other than `order_count` or `id`.
    pub fn parse(raw: Option<&str>) -> Result<Self, SortError> {
        match raw.map(str::trim) {
            None | Some("" | "order_count") => Ok(Self::OrderCountDesc),
            Some("id") => Ok(Self::IdAsc),
            Some(other) => Err(SortError(other.to_owned())),
        }
    }

    /// Whether sorting needs the derived order count.
    #[must_use]
    pub const fn uses_derived_field(&self) -> bool {
        matches!(self, Self::OrderCountDesc)
    }

    /// Compare two `(id, order_count)` keys under this order.
    #[must_use]
    pub fn compare(&self, a: (CustomerId, u64), b: (CustomerId, u64)) -> Ordering {
        match self {
            Self::OrderCountDesc => b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)),
            Self::IdAsc => a.0.cmp(&b.0),
        }
    }
}

/// A fully sanitized customer listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerListQuery {
    pub page: PageRequest,
    pub filter: CustomerFilter,
    pub sort: CustomerSort,
}

impl CustomerListQuery {
    /// The aggregation pipeline that selects this query's page.
    #[must_use]
    pub fn pipeline(&self) -> CustomerPipeline {
        CustomerPipeline {
            filter: self.filter.clone(),
            sort: self.sort,
            window: Some(self.page.window()),
        }
    }
}

/// Filter, sort and window stages applied to aggregated customer rows.
///
/// With `window: None` the pipeline returns every matching row, which is
/// how the count path reuses the selection path's filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPipeline {
    pub filter: CustomerFilter,
    pub sort: CustomerSort,
    pub window: Option<PageWindow>,
}

impl CustomerPipeline {
    /// Run the pipeline over aggregated rows.
    pub fn run(
        &self,
        rows: impl IntoIterator<Item = CustomerWithOrderCount>,
    ) -> Vec<CustomerWithOrderCount> {
        let mut matching: Vec<_> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .collect();
        matching.sort_by(|a, b| {
            self.sort
                .compare((a.customer.id, a.order_count), (b.customer.id, b.order_count))
        });

        match self.window {
            Some(window) => window.apply(matching),
            None => matching,
        }
    }

    /// Count the rows that pass the filter stages, ignoring sort and window.
    pub fn count<'a>(&self, rows: impl IntoIterator<Item = &'a CustomerWithOrderCount>) -> u64 {
        rows.into_iter().filter(|row| self.matches(row)).count() as u64
    }

    fn matches(&self, row: &CustomerWithOrderCount) -> bool {
        self.filter.matches(&DerivedValues {
            order_count: row.order_count,
        })
    }
}

/// Group orders by `user_id` and count them.
pub fn group_order_counts<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
) -> HashMap<CustomerId, u64> {
    let mut counts = HashMap::new();
    for order in orders {
        *counts.entry(order.user_id).or_insert(0) += 1;
    }
    counts
}

/// Order listing order: newest `created_at` first, then highest `order_id`.
#[must_use]
pub fn newest_first(a: &Order, b: &Order) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.order_id.cmp(&a.order_id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::Customer;
    use crate::query::filter::{CompareOp, DerivedField, FilterStage};
    use crate::query::pagination::PageLimits;
    use crate::types::{Email, Gender, OrderId, OrderStatus};

    fn row(id: i64, order_count: u64) -> CustomerWithOrderCount {
        CustomerWithOrderCount {
            customer: Customer {
                id: CustomerId::new(id),
                first_name: format!("First{id}"),
                last_name: format!("Last{id}"),
                email: Email::parse(&format!("customer{id}@example.com")).unwrap(),
                age: None,
                gender: Gender::Female,
                state: None,
                street_address: None,
                postal_code: None,
                city: None,
                country: None,
                latitude: None,
                longitude: None,
                traffic_source: None,
                created_at: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
            },
            order_count,
        }
    }

    fn ids(rows: &[CustomerWithOrderCount]) -> Vec<i64> {
        rows.iter().map(|row| row.customer.id.as_i64()).collect()
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(CustomerSort::parse(None).unwrap(), CustomerSort::OrderCountDesc);
        assert_eq!(CustomerSort::parse(Some("id")).unwrap(), CustomerSort::IdAsc);
        assert!(CustomerSort::parse(Some("email")).is_err());
    }

    #[test]
    fn test_run_sorts_by_count_then_id() {
        let pipeline = CustomerPipeline::default();
        let rows = vec![row(3, 0), row(1, 0), row(2, 3), row(4, 3)];
        assert_eq!(ids(&pipeline.run(rows)), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_run_filters_before_windowing() {
        let pipeline = CustomerPipeline {
            filter: CustomerFilter::from_stages(vec![FilterStage::new(
                DerivedField::OrderCount,
                CompareOp::Eq,
                0,
            )]),
            sort: CustomerSort::OrderCountDesc,
            window: Some(PageRequest::new(1, 2, PageLimits::default()).window()),
        };
        let rows = vec![row(1, 5), row(2, 0), row(3, 4), row(4, 0), row(5, 0)];
        assert_eq!(ids(&pipeline.run(rows)), vec![2, 4]);
    }

    #[test]
    fn test_count_ignores_window() {
        let pipeline = CustomerPipeline {
            filter: CustomerFilter::from_stages(vec![FilterStage::new(
                DerivedField::OrderCount,
                CompareOp::Gt,
                0,
            )]),
            sort: CustomerSort::IdAsc,
            window: Some(PageRequest::new(1, 1, PageLimits::default()).window()),
        };
        let rows = [row(1, 1), row(2, 0), row(3, 2)];
        assert_eq!(pipeline.count(rows.iter()), 2);
    }

    #[test]
    fn test_group_order_counts() {
        let at = Utc.with_ymd_and_hms(2022, 10, 20, 10, 3, 0).unwrap();
        let order = |order_id: i64, user_id: i64| Order {
            order_id: OrderId::new(order_id),
            user_id: CustomerId::new(user_id),
            status: OrderStatus::Delivered,
            gender: None,
            num_of_item: 1,
            created_at: at,
        };
        let orders = [order(8, 457), order(9, 457), order(10, 458)];
        let counts = group_order_counts(orders.iter());
        assert_eq!(counts[&CustomerId::new(457)], 2);
        assert_eq!(counts[&CustomerId::new(458)], 1);
        assert!(!counts.contains_key(&CustomerId::new(459)));
    }

    #[test]
    fn test_newest_first() {
        let order = |order_id: i64, day: u32| Order {
            order_id: OrderId::new(order_id),
            user_id: CustomerId::new(1),
            status: OrderStatus::Pending,
            gender: None,
            num_of_item: 1,
            created_at: Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap(),
        };
        let mut orders = vec![order(1, 1), order(2, 3), order(3, 3), order(4, 2)];
        orders.sort_by(newest_first);
        let ids: Vec<i64> = orders.iter().map(|o| o.order_id.as_i64()).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }
}
