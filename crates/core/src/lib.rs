//! Clientele Core - Shared types library.
//!
//! This crate provides the types used across all Clientele components:
//! - `api` - REST API serving customer and order listings
//! - `cli` - Command-line tools for migrations and store checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. The listing rules that must hold no matter
//! which record store answers a query (pagination arithmetic, derived-field
//! filter stages, sort order) live here so every store adapter evaluates
//! them identically.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and statuses
//! - [`models`] - Customer and order records plus their API views
//! - [`query`] - Pagination, order-count filters and the listing pipeline

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod query;
pub mod types;

pub use models::*;
pub use query::*;
pub use types::*;
