//! Extraction collaborator implementations.

pub mod http;

pub use http::HttpExtractor;
