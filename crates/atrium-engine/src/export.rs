//! Snapshot export
//!
//! Reads every entity kind in the expanded selection and packs the
//! records into a versioned [`Archive`]. Read-only and fail-closed: the
//! first failed read aborts the export and no archive is produced.

use crate::archive::{Archive, ArchiveMeta, ARCHIVE_VERSION};
use crate::context::OpContext;
use crate::error::EngineError;
use crate::validate_selection;
use atrium_domain::{EntityGraph, EntityKind, Selection};
use atrium_store::EntityStore;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Exports snapshots of the entity store
pub struct Exporter {
    graph: Arc<EntityGraph>,
    store: Arc<dyn EntityStore>,
}

impl Exporter {
    /// Create an exporter over a store
    #[must_use]
    pub fn new(graph: Arc<EntityGraph>, store: Arc<dyn EntityStore>) -> Self {
        Self { graph, store }
    }

    /// Export the expanded selection as a fresh archive
    ///
    /// `meta.entities` lists exactly the expanded selection in registry
    /// dependency order.
    ///
    /// # Errors
    /// Fails on an invalid selection or on the first failed read; no
    /// partial archive is ever returned.
    pub async fn export(
        &self,
        selection: &Selection,
        ctx: &OpContext,
    ) -> Result<Archive, EngineError> {
        validate_selection(&self.graph, selection)?;
        let expanded = self.graph.expand(selection);
        let entities: Vec<EntityKind> = self
            .graph
            .dependency_order()
            .iter()
            .copied()
            .filter(|kind| expanded.contains(*kind))
            .collect();

        let mut data = BTreeMap::new();
        for kind in &entities {
            ctx.checkpoint()?;
            let records = self.store.find_all(*kind).await?;
            let values = records
                .iter()
                .map(|record| {
                    record
                        .to_value()
                        .map_err(|source| EngineError::Encode { kind: *kind, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            data.insert(*kind, values);
        }

        tracing::debug!(entities = entities.len(), "export complete");
        Ok(Archive {
            meta: ArchiveMeta {
                version: ARCHIVE_VERSION,
                created_at: Utc::now(),
                entities,
            },
            data,
        })
    }
}
