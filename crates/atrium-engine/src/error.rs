//! Engine error types
//!
//! Validation failures are raised before any transaction opens; store
//! failures abort the surrounding transaction; cancellation and deadline
//! expiry abort between store calls and trigger rollback.

use atrium_domain::EntityKind;
use atrium_store::StoreError;

/// Errors surfaced by export, restore and reset operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested selection names an unknown or internal kind
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The archive declares a version this engine does not understand
    #[error("unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// An archive payload entry does not match its kind's record shape
    #[error("malformed {kind} record in archive: {source}")]
    MalformedRecord {
        /// Kind whose payload failed to decode
        kind: EntityKind,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded into the archive
    #[error("failed to encode {kind} record: {source}")]
    Encode {
        /// Kind whose record failed to encode
        kind: EntityKind,
        /// Underlying encode error
        #[source]
        source: serde_json::Error,
    },

    /// The entity store failed; the surrounding transaction rolled back
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Credential hashing failed during baseline reseeding
    #[error("credential hashing failed: {0}")]
    Credential(String),

    /// The operation was cancelled between store calls
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's deadline expired between store calls
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}
