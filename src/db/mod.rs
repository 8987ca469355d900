//! Persistence boundary and the in-memory implementation.

/// In-memory repository for tests and local development.
pub mod memory;
/// Repository trait and timeout helper.
pub mod traits;

pub use memory::{MemoryRepository, Seed};
pub use traits::{Repository, with_timeout};
