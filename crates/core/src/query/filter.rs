//! Filters over derived customer fields and over orders.
//!
//! A [`CustomerFilter`] is a conjunction of [`FilterStage`]s. Each stage
//! compares one [`DerivedField`] against a constant, and all stages are
//! applied after the customer/order grouping step, before sorting and
//! windowing. Selection and counting both take the same `CustomerFilter`
//! value, so a page and its total can never be computed under different
//! predicates.

use serde::{Deserialize, Serialize};

use crate::models::Order;
use crate::types::{CustomerId, OrderStatus};

/// Errors raised while building a filter from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A parameter value could not be parsed.
    #[error("invalid value for {param}: {value:?}")]
    InvalidValue { param: &'static str, value: String },

    /// More than one kind of order-count filter was supplied.
    #[error("only one order count filter may be used at a time, got: {}", .0.join(", "))]
    ConflictingFilters(Vec<&'static str>),
}

/// A value computed per customer by the aggregation rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedField {
    /// Number of orders whose `user_id` equals the customer id.
    OrderCount,
}

impl DerivedField {
    /// Column name of the field in aggregation output.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::OrderCount => "order_count",
        }
    }
}

/// Derived values computed for one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedValues {
    pub order_count: u64,
}

impl DerivedValues {
    /// Value of `field`, widened to `i64` for comparison.
    #[must_use]
    pub fn get(&self, field: DerivedField) -> i64 {
        match field {
            DerivedField::OrderCount => i64::try_from(self.order_count).unwrap_or(i64::MAX),
        }
    }
}

/// Comparison operator of a filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lte,
}

impl CompareOp {
    /// Evaluate `lhs <op> rhs`.
    #[must_use]
    pub const fn eval(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Gt => lhs > rhs,
            Self::Gte => lhs >= rhs,
            Self::Lte => lhs <= rhs,
        }
    }

    /// SQL spelling of the operator.
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// One predicate `field <op> value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterStage {
    pub field: DerivedField,
    pub op: CompareOp,
    pub value: i64,
}

impl FilterStage {
    /// Create a stage.
    #[must_use]
    pub const fn new(field: DerivedField, op: CompareOp, value: i64) -> Self {
        Self { field, op, value }
    }

    /// Whether the derived values satisfy this stage.
    #[must_use]
    pub fn matches(&self, values: &DerivedValues) -> bool {
        self.op.eval(values.get(self.field), self.value)
    }
}

/// Normalized echo of the filter a listing was computed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_order_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_orders: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_orders: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_orders: Option<bool>,
}

/// Conjunction of filter stages applied after grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    stages: Vec<FilterStage>,
    applied: AppliedFilters,
}

impl CustomerFilter {
    /// A filter that matches every customer.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from explicit stages.
    #[must_use]
    pub fn from_stages(stages: Vec<FilterStage>) -> Self {
        Self {
            stages,
            applied: AppliedFilters::default(),
        }
    }

    /// The stages of this filter.
    #[must_use]
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// The filter parameters this filter was built from.
    #[must_use]
    pub const fn applied(&self) -> &AppliedFilters {
        &self.applied
    }

    /// Whether this filter has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether the derived values satisfy every stage.
    #[must_use]
    pub fn matches(&self, values: &DerivedValues) -> bool {
        self.stages.iter().all(|stage| stage.matches(values))
    }
}

/// Raw order-count filter parameters as they arrive in a query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFilterParams<'a> {
    pub order_count: Option<&'a str>,
    pub min_orders: Option<&'a str>,
    pub max_orders: Option<&'a str>,
    pub has_orders: Option<&'a str>,
}

/// Parsed order-count filter parameters.
///
/// Three kinds of filter exist: exact (`order_count`), range
/// (`min_orders` and/or `max_orders`) and boolean (`has_orders`). At most
/// one kind may be present; [`FilterParams::resolve`] rejects the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub order_count: Option<i64>,
    pub min_orders: Option<i64>,
    pub max_orders: Option<i64>,
    pub has_orders: Option<bool>,
}

impl FilterParams {
    /// Parse raw query-string values.
    ///
    /// Empty strings are treated as absent. `has_orders` accepts `true` or
    /// `false` in any case.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidValue` for a value that does not parse.
    pub fn parse(raw: RawFilterParams<'_>) -> Result<Self, FilterError> {
        Ok(Self {
            order_count: parse_count("orderCount", raw.order_count)?,
            min_orders: parse_count("minOrders", raw.min_orders)?,
            max_orders: parse_count("maxOrders", raw.max_orders)?,
            has_orders: parse_flag("hasOrders", raw.has_orders)?,
        })
    }

    /// Turn the parameters into filter stages.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::ConflictingFilters` when more than one filter
    /// kind is present.
    pub fn resolve(self) -> Result<CustomerFilter, FilterError> {
        let mut kinds = Vec::new();
        if self.order_count.is_some() {
            kinds.push("orderCount");
        }
        if self.min_orders.is_some() || self.max_orders.is_some() {
            kinds.push("minOrders/maxOrders");
        }
        if self.has_orders.is_some() {
            kinds.push("hasOrders");
        }
        if kinds.len() > 1 {
            return Err(FilterError::ConflictingFilters(kinds));
        }

        let field = DerivedField::OrderCount;
        let mut stages = Vec::new();
        if let Some(count) = self.order_count {
            stages.push(FilterStage::new(field, CompareOp::Eq, count));
        }
        if let Some(min) = self.min_orders {
            stages.push(FilterStage::new(field, CompareOp::Gte, min));
        }
        if let Some(max) = self.max_orders {
            stages.push(FilterStage::new(field, CompareOp::Lte, max));
        }
        match self.has_orders {
            Some(true) => stages.push(FilterStage::new(field, CompareOp::Gt, 0)),
            Some(false) => stages.push(FilterStage::new(field, CompareOp::Eq, 0)),
            None => {}
        }

        Ok(CustomerFilter {
            stages,
            applied: AppliedFilters {
                exact_order_count: self.order_count,
                min_orders: self.min_orders,
                max_orders: self.max_orders,
                has_orders: self.has_orders,
            },
        })
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_count(param: &'static str, raw: Option<&str>) -> Result<Option<i64>, FilterError> {
    non_empty(raw)
        .map(|value| {
            value.parse::<i64>().map_err(|_| FilterError::InvalidValue {
                param,
                value: value.to_owned(),
            })
        })
        .transpose()
}

fn parse_flag(param: &'static str, raw: Option<&str>) -> Result<Option<bool>, FilterError> {
    non_empty(raw)
        .map(|value| {
            if value.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if value.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(FilterError::InvalidValue {
                    param,
                    value: value.to_owned(),
                })
            }
        })
        .transpose()
}

/// Selection criteria for order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<CustomerId>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    /// Orders placed by one customer.
    #[must_use]
    pub const fn for_customer(user_id: CustomerId) -> Self {
        Self {
            user_id: Some(user_id),
            status: None,
        }
    }

    /// Whether `order` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|id| order.user_id == id)
            && self.status.is_none_or(|status| order.status == status)
    }
}
