//! Entity-store capability traits
//!
//! The engine never issues raw queries; every write path funnels through
//! an [`EntityTransaction`] obtained from an [`EntityStore`]. Each call
//! is a suspension point: real drivers perform blocking I/O behind these
//! methods.

use crate::error::StoreError;
use async_trait::async_trait;
use atrium_domain::{EntityKind, FkField, Record};

/// Whether an upsert inserted a fresh record or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record with that key existed
    Inserted,
    /// An existing record's non-key fields were overwritten
    Updated,
}

/// Transactional CRUD per entity kind
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Read every record of a kind outside any transaction
    async fn find_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError>;

    /// Open a transaction covering all entity kinds
    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, StoreError>;
}

/// One ambient transaction handle
///
/// Mutations are invisible to other readers until [`commit`] succeeds;
/// dropping the handle or calling [`rollback`] discards them.
///
/// [`commit`]: EntityTransaction::commit
/// [`rollback`]: EntityTransaction::rollback
#[async_trait]
pub trait EntityTransaction: Send {
    /// Read every record of a kind as seen by this transaction
    async fn find_all(&mut self, kind: EntityKind) -> Result<Vec<Record>, StoreError>;

    /// Insert or overwrite a record by its identity key
    async fn upsert(&mut self, record: Record) -> Result<UpsertOutcome, StoreError>;

    /// Delete every record of a kind, returning the deleted count
    async fn delete_all(&mut self, kind: EntityKind) -> Result<u64, StoreError>;

    /// Null out one foreign-key field on every record of a kind
    ///
    /// Returns how many records actually held a value. Required fields
    /// are left untouched.
    async fn clear_reference(&mut self, kind: EntityKind, field: FkField)
        -> Result<u64, StoreError>;

    /// Atomically apply every mutation made through this handle
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every mutation made through this handle
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
