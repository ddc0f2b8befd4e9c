//! Seams between the monitoring core and its collaborators.
//!
//! Applications implement these to plug in a record backend, a way of
//! fetching pages and an extraction service.

pub mod extractor;
pub mod fetcher;
pub mod store;
