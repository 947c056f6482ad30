//! In-memory reference store
//!
//! Snapshot transactions: `begin` clones the current tables, mutations
//! run against the clone, and `commit` validates referential integrity
//! before swapping the clone in. Concurrent readers keep seeing the old
//! tables until the swap; administrative write operations are expected
//! to be serialized by the caller.

use crate::error::StoreError;
use crate::traits::{EntityStore, EntityTransaction, UpsertOutcome};
use async_trait::async_trait;
use atrium_domain::{EntityGraph, EntityKind, FkField, Record, RecordKey};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

type Tables = BTreeMap<EntityKind, BTreeMap<RecordKey, Record>>;

/// Transactional in-memory entity store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    graph: Arc<EntityGraph>,
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store with one table per registered kind
    #[must_use]
    pub fn new(graph: Arc<EntityGraph>) -> Self {
        let tables = graph
            .descriptors()
            .map(|d| (d.kind, BTreeMap::new()))
            .collect();
        Self {
            graph,
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Registry this store was built against
    #[must_use]
    pub fn graph(&self) -> &Arc<EntityGraph> {
        &self.graph
    }

    /// Upsert a batch of records in one transaction
    ///
    /// Convenience for fixtures and seeding paths.
    ///
    /// # Errors
    /// Fails if any record's kind is unknown or the batch violates
    /// referential integrity; nothing is applied in that case.
    pub async fn seed(
        &self,
        records: impl IntoIterator<Item = Record> + Send,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        for record in records {
            tx.upsert(record).await?;
        }
        tx.commit().await
    }

    /// Total number of records of a kind
    ///
    /// # Errors
    /// Fails when the kind is unknown to this store.
    pub fn count(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let tables = self.tables.read();
        let table = tables.get(&kind).ok_or(StoreError::UnknownKind(kind))?;
        Ok(table.len() as u64)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read();
        let table = tables.get(&kind).ok_or(StoreError::UnknownKind(kind))?;
        Ok(table.values().cloned().collect())
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, StoreError> {
        let snapshot = self.tables.read().clone();
        Ok(Box::new(MemoryTransaction {
            graph: Arc::clone(&self.graph),
            tables: Arc::clone(&self.tables),
            snapshot,
        }))
    }
}

/// Snapshot transaction over a [`MemoryStore`]
struct MemoryTransaction {
    graph: Arc<EntityGraph>,
    tables: Arc<RwLock<Tables>>,
    snapshot: Tables,
}

impl MemoryTransaction {
    fn table_mut(
        &mut self,
        kind: EntityKind,
    ) -> Result<&mut BTreeMap<RecordKey, Record>, StoreError> {
        self.snapshot
            .get_mut(&kind)
            .ok_or(StoreError::UnknownKind(kind))
    }

    /// Every foreign key in the snapshot must resolve to a live identity
    fn verify_integrity(&self) -> Result<(), StoreError> {
        for (kind, table) in &self.snapshot {
            for record in table.values() {
                for (field, id) in record.foreign_keys() {
                    let target = self
                        .graph
                        .edge_target(*kind, field)
                        .ok_or(StoreError::UndeclaredEdge { kind: *kind, field })?;
                    let resolved = self
                        .snapshot
                        .get(&target)
                        .is_some_and(|t| t.contains_key(&RecordKey::Id(id)));
                    if !resolved {
                        return Err(StoreError::ForeignKeyViolation {
                            kind: *kind,
                            field,
                            target,
                            key: RecordKey::Id(id),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityTransaction for MemoryTransaction {
    async fn find_all(&mut self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let table = self
            .snapshot
            .get(&kind)
            .ok_or(StoreError::UnknownKind(kind))?;
        Ok(table.values().cloned().collect())
    }

    async fn upsert(&mut self, record: Record) -> Result<UpsertOutcome, StoreError> {
        let table = self.table_mut(record.kind())?;
        match table.insert(record.key(), record) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn delete_all(&mut self, kind: EntityKind) -> Result<u64, StoreError> {
        let table = self.table_mut(kind)?;
        let deleted = table.len() as u64;
        table.clear();
        Ok(deleted)
    }

    async fn clear_reference(
        &mut self,
        kind: EntityKind,
        field: FkField,
    ) -> Result<u64, StoreError> {
        let table = self.table_mut(kind)?;
        let mut cleared = 0;
        for record in table.values_mut() {
            if record.clear_foreign_key(field) {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.verify_integrity()?;
        *self.tables.write() = self.snapshot;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_domain::{Category, Link, Tenant, Unit};
    use uuid::Uuid;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(EntityGraph::new()))
    }

    #[tokio::test]
    async fn commit_makes_writes_visible() {
        let store = store();
        let tenant = Tenant::new("Acme");

        let mut tx = store.begin().await.unwrap();
        tx.upsert(tenant.clone().into()).await.unwrap();
        assert_eq!(store.count(EntityKind::Tenant).unwrap(), 0);
        tx.commit().await.unwrap();

        let all = store.find_all(EntityKind::Tenant).await.unwrap();
        assert_eq!(all, vec![Record::Tenant(tenant)]);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        tx.upsert(Tenant::new("Acme").into()).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.count(EntityKind::Tenant).unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_reports_insert_then_update() {
        let store = store();
        let tenant = Tenant::new("Acme");
        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.upsert(tenant.clone().into()).await.unwrap(),
            UpsertOutcome::Inserted
        );
        let mut renamed = tenant;
        renamed.name = "Acme Corp".to_string();
        assert_eq!(
            tx.upsert(renamed.into()).await.unwrap(),
            UpsertOutcome::Updated
        );
        tx.commit().await.unwrap();
        assert_eq!(store.count(EntityKind::Tenant).unwrap(), 1);
    }

    #[tokio::test]
    async fn commit_rejects_dangling_reference() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        tx.upsert(Unit::new(Uuid::new_v4(), "Operations").into())
            .await
            .unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
        assert_eq!(store.count(EntityKind::Unit).unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_reference_counts_only_set_fields() {
        let store = store();
        let tenant = Tenant::new("Acme");
        let category = Category::new(tenant.id, "HR");
        let filed = Link::new("Handbook", "https://example.com/h").with_category(category.id);
        let unfiled = Link::new("Wiki", "https://example.com/w");
        store
            .seed([
                tenant.into(),
                category.into(),
                filed.into(),
                unfiled.into(),
            ])
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let cleared = tx
            .clear_reference(EntityKind::Link, FkField::CategoryId)
            .await
            .unwrap();
        assert_eq!(cleared, 1);
        tx.commit().await.unwrap();

        for record in store.find_all(EntityKind::Link).await.unwrap() {
            assert!(record.foreign_keys().is_empty());
        }
    }

    #[tokio::test]
    async fn delete_all_returns_count() {
        let store = store();
        let tenant = Tenant::new("Acme");
        let a = Category::new(tenant.id, "HR");
        let b = Category::new(tenant.id, "IT");
        store
            .seed([tenant.into(), a.into(), b.into()])
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.delete_all(EntityKind::Category).await.unwrap(), 2);
        tx.commit().await.unwrap();
        assert_eq!(store.count(EntityKind::Category).unwrap(), 0);
    }
}
