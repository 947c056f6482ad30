//! Atrium Store
//!
//! The transactional entity-store capability the backup engine consumes.
//!
//! # Core Concepts
//!
//! - [`EntityStore`] / [`EntityTransaction`]: the async CRUD seam; real
//!   deployments implement these over the portal's relational driver
//! - [`MemoryStore`]: the in-memory reference implementation with
//!   snapshot transactions and commit-time referential-integrity checks
//! - [`StoreError`]: the driver-level error taxonomy

mod error;
mod memory;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{EntityStore, EntityTransaction, UpsertOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
