//! Process-local caches used during a run.
//!
//! - `PageCache`: fetched page content keyed by URL, with a TTL and an
//!   optional JSON file that survives between runs
//! - `HashIndex`: content digests seen in the current run

pub mod hash_index;
pub mod page_cache;

pub use hash_index::{normalize_content, HashIndex};
pub use page_cache::{CacheEntry, PageCache};
