//! Store error types

use atrium_domain::{EntityKind, FkField, RecordKey};

/// Errors surfaced by an entity store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store has no table for the requested kind
    #[error("unknown entity kind: {0}")]
    UnknownKind(EntityKind),

    /// A record references a field the registry does not declare
    ///
    /// Indicates the registry is out of sync with the live schema.
    #[error("undeclared foreign key {kind}.{field}")]
    UndeclaredEdge {
        /// Kind holding the stray reference
        kind: EntityKind,
        /// Field with no matching registry edge
        field: FkField,
    },

    /// A record references an identity that does not exist
    #[error("foreign key violation: {kind}.{field} references missing {target} {key}")]
    ForeignKeyViolation {
        /// Kind holding the dangling reference
        kind: EntityKind,
        /// Field holding the dangling reference
        field: FkField,
        /// Kind the reference points at
        target: EntityKind,
        /// The missing identity
        key: RecordKey,
    },

    /// The underlying driver failed (connection loss, I/O)
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
