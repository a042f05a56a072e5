//! Application state shared across handlers.

use std::sync::Arc;

use clientele_core::PageLimits;

use crate::db::RecordStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the record store so the same
/// router serves `PostgreSQL` in production and an in-memory store in tests.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    page_limits: PageLimits,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RecordStore> AppState<S> {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Record store answering every query
    /// * `page_limits` - Default and maximum page sizes
    #[must_use]
    pub fn new(store: S, page_limits: PageLimits) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, page_limits }),
        }
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get the configured page size limits.
    #[must_use]
    pub fn page_limits(&self) -> PageLimits {
        self.inner.page_limits
    }
}
