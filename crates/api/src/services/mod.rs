//! Query services.
//!
//! Services sit between the HTTP handlers and the [`RecordStore`]: they
//! pick the listing strategy, issue independent reads concurrently and
//! assemble the response models.
//!
//! [`RecordStore`]: crate::db::RecordStore

pub mod customers;
pub mod orders;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use clientele_core::FilterError;

use crate::db::RepositoryError;

pub use customers::{CustomerService, ListingStrategy};
pub use orders::OrderService;

/// Errors returned by the query services.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The record store failed. Never retried.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] RepositoryError),

    /// A single-entity lookup found nothing.
    #[error("{0} not found")]
    NotFound(String),

    /// Order-count filter parameters were malformed or combined.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    /// A query or path parameter could not be interpreted.
    #[error("invalid {param}: {value:?}")]
    InvalidParameter { param: &'static str, value: String },

    /// A strategy was forced on a query it cannot answer correctly.
    #[error("{0:?} cannot answer this query")]
    StrategyNotApplicable(ListingStrategy),
}

impl QueryError {
    /// Shorthand for [`QueryError::InvalidParameter`].
    pub fn invalid_parameter(param: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            value: value.into(),
        }
    }
}
