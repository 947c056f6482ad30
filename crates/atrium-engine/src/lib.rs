//! Atrium Backup & Reset Engine
//!
//! Exports consistent snapshots of a selectable subset of the portal's
//! entities, restores them with idempotent merge semantics in
//! foreign-key order, and destructively resets selections while
//! reseeding the baseline state the portal needs to stay operable.
//!
//! # Core Concepts
//!
//! - [`Exporter`]: read-only, fail-closed snapshot export
//! - [`Restorer`]: upsert-by-identity restore inside one transaction
//! - [`Resetter`]: detach → clear dependents → delete → reseed, inside
//!   one transaction
//! - [`Archive`]: the versioned snapshot exchanged between them
//! - [`OpContext`]: deadline/cancellation checked before every store
//!   call
//!
//! All write paths funnel through the [`atrium_store::EntityStore`]
//! capability; the engine never issues raw queries and never spawns
//! worker pools.

mod archive;
mod context;
mod error;
mod export;
mod reset;
mod restore;
pub mod seed;

pub use archive::{Archive, ArchiveMeta, ARCHIVE_VERSION};
pub use context::{CancelHandle, OpContext};
pub use error::EngineError;
pub use export::Exporter;
pub use reset::{ResetReport, Resetter};
pub use restore::{RestoreMode, RestoreReport, Restorer};

use atrium_domain::{EntityGraph, Selection};

/// Reject selections naming unknown or internal kinds
pub(crate) fn validate_selection(
    graph: &EntityGraph,
    selection: &Selection,
) -> Result<(), EngineError> {
    for kind in selection.iter() {
        if !graph.is_selectable(kind) {
            return Err(EngineError::InvalidSelection(format!(
                "{kind} is not a selectable entity kind"
            )));
        }
    }
    Ok(())
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
