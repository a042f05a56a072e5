//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. CORS (permissive)
//! 3. `TraceLayer` (request span with an empty `request_id` field)
//! 4. Request ID (fills the span field, sets the response header)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
