//! Page fetching and source listing implementations.

pub mod http;

pub use http::HttpFetcher;
