//! Atrium Domain
//!
//! Entity model of the Atrium content portal as seen by the backup &
//! reset engine.
//!
//! # Core Concepts
//!
//! - [`EntityKind`]: the named kinds of domain record
//! - [`Record`]: a typed record of any kind, with identity key and
//!   foreign-key accessors
//! - [`EntityGraph`]: the injected, immutable registry of kinds,
//!   foreign-key edges and the deletion-safe topological order
//! - [`Selection`]: the transient set of kinds an operation targets,
//!   closed over the registry's expansion rules

mod entities;
mod graph;
mod selection;

pub use entities::{
    Category, Document, EntityKind, EntityStatus, FkField, Link, Record, RecordKey, Role,
    RolePolicy, Sector, Session, Tag, TagLink, Tenant, Unit, User,
};
pub use graph::{EntityDescriptor, EntityGraph, FkEdge};
pub use selection::Selection;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
