//! Merge restore
//!
//! Applies an archive back into the store in registry dependency order,
//! upserting by identity key inside one transaction. Identity keys are
//! never regenerated, so cross-entity references inside the archive stay
//! valid. Running the same restore twice yields the same final state and
//! the same per-kind counts.

use crate::archive::{Archive, ARCHIVE_VERSION};
use crate::context::OpContext;
use crate::error::EngineError;
use crate::validate_selection;
use atrium_domain::{EntityGraph, EntityKind, Record, Selection};
use atrium_store::{EntityStore, EntityTransaction};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How restore applies archive records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreMode {
    /// Upsert by identity; the only operative mode
    Merge,
    /// Any other requested mode; accepted but performs zero writes
    Unsupported(String),
}

impl RestoreMode {
    /// Parse a caller-supplied mode string; never fails
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "merge" => RestoreMode::Merge,
            other => RestoreMode::Unsupported(other.to_string()),
        }
    }
}

impl Default for RestoreMode {
    fn default() -> Self {
        RestoreMode::Merge
    }
}

/// Per-kind outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Records processed per kind
    pub restored: BTreeMap<EntityKind, u64>,
    /// Kinds skipped because the requested mode is unsupported
    pub skipped: Vec<EntityKind>,
}

/// Restores archives into the entity store
pub struct Restorer {
    graph: Arc<EntityGraph>,
    store: Arc<dyn EntityStore>,
}

impl Restorer {
    /// Create a restorer over a store
    #[must_use]
    pub fn new(graph: Arc<EntityGraph>, store: Arc<dyn EntityStore>) -> Self {
        Self { graph, store }
    }

    /// Apply an archive, targeting `selection` when given, otherwise the
    /// archive's own entity list (falling back to its data keys)
    ///
    /// Archive version and payload shapes are validated before any
    /// transaction opens; every write happens inside one transaction and
    /// any failure rolls the whole restore back.
    ///
    /// # Errors
    /// Fails on unknown archive versions, invalid selections, malformed
    /// payloads, cancellation, and store failures.
    pub async fn restore(
        &self,
        archive: &Archive,
        selection: Option<&Selection>,
        mode: &RestoreMode,
        ctx: &OpContext,
    ) -> Result<RestoreReport, EngineError> {
        if archive.meta.version != ARCHIVE_VERSION {
            return Err(EngineError::UnsupportedVersion(archive.meta.version));
        }
        let targets = self.resolve_targets(archive, selection)?;

        if let RestoreMode::Unsupported(requested) = mode {
            tracing::warn!(mode = %requested, "unsupported restore mode requested, skipping all writes");
            return Ok(RestoreReport {
                restored: BTreeMap::new(),
                skipped: targets,
            });
        }

        // Decode everything up front so a malformed payload can never
        // leave a transaction half-applied.
        let mut batches: Vec<(EntityKind, Vec<Record>)> = Vec::with_capacity(targets.len());
        for kind in targets {
            let values = archive.data.get(&kind).cloned().unwrap_or_default();
            let records = values
                .into_iter()
                .map(|value| {
                    Record::from_value(kind, value)
                        .map_err(|source| EngineError::MalformedRecord { kind, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            batches.push((kind, records));
        }

        let mut tx = self.store.begin().await?;
        match apply_batches(tx.as_mut(), &batches, ctx).await {
            Ok(restored) => {
                tx.commit().await?;
                tracing::info!(kinds = restored.len(), "restore committed");
                Ok(RestoreReport {
                    restored,
                    skipped: Vec::new(),
                })
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Resolve and order the kinds this restore targets
    fn resolve_targets(
        &self,
        archive: &Archive,
        selection: Option<&Selection>,
    ) -> Result<Vec<EntityKind>, EngineError> {
        let requested: Selection = match selection {
            Some(sel) if !sel.is_empty() => sel.clone(),
            _ if !archive.meta.entities.is_empty() => {
                archive.meta.entities.iter().copied().collect()
            }
            _ => archive.data.keys().copied().collect(),
        };
        validate_selection(&self.graph, &requested)?;
        Ok(self
            .graph
            .dependency_order()
            .iter()
            .copied()
            .filter(|kind| requested.contains(*kind))
            .collect())
    }
}

async fn apply_batches(
    tx: &mut (dyn EntityTransaction + '_),
    batches: &[(EntityKind, Vec<Record>)],
    ctx: &OpContext,
) -> Result<BTreeMap<EntityKind, u64>, EngineError> {
    let mut restored = BTreeMap::new();
    for (kind, records) in batches {
        let mut processed = 0u64;
        for record in records {
            ctx.checkpoint()?;
            tx.upsert(record.clone()).await?;
            processed += 1;
        }
        restored.insert(*kind, processed);
    }
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_accepts_anything() {
        assert_eq!(RestoreMode::parse("merge"), RestoreMode::Merge);
        assert_eq!(
            RestoreMode::parse("replace"),
            RestoreMode::Unsupported("replace".to_string())
        );
    }
}
