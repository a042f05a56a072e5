//! Customer records and views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::order::Order;
use crate::query::{AppliedFilters, PaginationInfo};
use crate::types::{CustomerId, Email, Gender};

/// Build a display name from first and last name.
///
/// Every code path (aggregation rows, page enrichment, single lookups, order
/// annotations) goes through this function so the result is identical
/// regardless of how the customer was fetched.
#[must_use]
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}").trim().to_owned()
}

/// A customer record as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub age: Option<i32>,
    pub gender: Gender,
    pub state: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub traffic_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Display name (`first_name last_name`, trimmed).
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

/// A customer joined with its derived order count.
///
/// This is the row shape produced by the customer/order aggregation, before
/// it is projected into a [`CustomerView`].
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerWithOrderCount {
    pub customer: Customer,
    pub order_count: u64,
}

/// Customer as returned by listing and lookup endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Email,
    pub order_count: u64,
}

impl CustomerView {
    /// Project a customer record and its order count into a view.
    #[must_use]
    pub fn new(customer: &Customer, order_count: u64) -> Self {
        Self {
            id: customer.id,
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            full_name: customer.full_name(),
            email: customer.email.clone(),
            order_count,
        }
    }
}

impl From<CustomerWithOrderCount> for CustomerView {
    fn from(row: CustomerWithOrderCount) -> Self {
        Self::new(&row.customer, row.order_count)
    }
}

/// Compact customer reference embedded in order views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub full_name: String,
}

impl From<&Customer> for CustomerSummary {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            full_name: customer.full_name(),
        }
    }
}

/// Filter echo returned with a customer page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersInfo {
    pub applied: AppliedFilters,
}

/// One page of the customer listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerView>,
    pub pagination: PaginationInfo,
    pub filters: FiltersInfo,
}

/// A single customer with every order it placed, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetail {
    pub customer: CustomerView,
    pub orders: Vec<Order>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer(first_name: &str, last_name: &str) -> Customer {
        Customer {
            id: CustomerId::new(457),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: Email::parse("timothybush@example.net").unwrap(),
            age: Some(65),
            gender: Gender::Male,
            state: Some("Acre".to_owned()),
            street_address: None,
            postal_code: None,
            city: Some("Rio Branco".to_owned()),
            country: Some("Brasil".to_owned()),
            latitude: Some(-9.945_567_619),
            longitude: Some(-67.835_609_91),
            traffic_source: Some("Search".to_owned()),
            created_at: DateTime::parse_from_rfc3339("2022-07-19T13:51:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_full_name_joins_and_trims() {
        assert_eq!(full_name("Timothy", "Bush"), "Timothy Bush");
        assert_eq!(full_name("Timothy", ""), "Timothy");
        assert_eq!(full_name("", "Bush"), "Bush");
        assert_eq!(full_name("", ""), "");
    }

    #[test]
    fn test_view_carries_derived_fields() {
        let view = CustomerView::new(&customer("Timothy", "Bush"), 2);
        assert_eq!(view.full_name, "Timothy Bush");
        assert_eq!(view.order_count, 2);
        assert_eq!(view.id, CustomerId::new(457));
    }

    #[test]
    fn test_view_serializes_flat_fields() {
        let view = CustomerView::new(&customer("Timothy", "Bush"), 0);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 457);
        assert_eq!(json["email"], "timothybush@example.net");
        assert_eq!(json["full_name"], "Timothy Bush");
        assert_eq!(json["order_count"], 0);
    }

    #[test]
    fn test_summary_matches_view_name() {
        let record = customer("Sarah", "Johnson");
        let summary = CustomerSummary::from(&record);
        assert_eq!(summary.full_name, CustomerView::new(&record, 5).full_name);
    }
}
