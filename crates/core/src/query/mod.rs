//! Listing rules shared by every record store.
//!
//! A customer listing is described by a [`CustomerListQuery`]: a sanitized
//! [`PageRequest`], a [`CustomerFilter`] made of [`FilterStage`]s over
//! derived fields, and a [`CustomerSort`]. Store adapters either translate
//! these into their native query language or evaluate them with
//! [`CustomerPipeline`].

pub mod filter;
pub mod pagination;
pub mod pipeline;

pub use filter::{
    AppliedFilters, CompareOp, CustomerFilter, DerivedField, DerivedValues, FilterError,
    FilterParams, FilterStage, OrderFilter, RawFilterParams,
};
pub use pagination::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OrderPaginationInfo, PageLimits, PageRequest, PageWindow,
    PaginationInfo,
};
pub use pipeline::{
    CustomerListQuery, CustomerPipeline, CustomerSort, SortError, group_order_counts,
    newest_first,
};
