//! Record backend implementations.
//!
//! Available backends:
//! - `MemoryRepository` - in-memory, for tests and development
//! - `DirectusRepository` - Directus-style REST backend
//! - `DryRunRepository` - wraps another backend and skips every write

pub mod directus;
pub mod dry_run;
pub mod memory;

pub use directus::DirectusRepository;
pub use dry_run::DryRunRepository;
pub use memory::MemoryRepository;
