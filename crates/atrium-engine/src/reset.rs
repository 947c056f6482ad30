//! Destructive reset
//!
//! Clears a selection of entity kinds while preserving referential
//! integrity, then reseeds the baseline state the portal needs to stay
//! operable. One transaction covers four phases:
//!
//! 1. Detach: null out nullable foreign keys held by surviving kinds
//!    that point into the selection
//! 2. Clear dependents: purge internal records (sessions) owned by a
//!    selected kind
//! 3. Delete: remove selected kinds in reverse dependency order
//! 4. Reseed: restore the baseline tenant, administrator and role
//!    policies where the selection removed them

use crate::context::OpContext;
use crate::error::EngineError;
use crate::seed;
use crate::validate_selection;
use atrium_domain::{EntityGraph, EntityKind, Selection};
use atrium_store::{EntityStore, EntityTransaction};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of a reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    /// Records deleted per kind
    pub deleted: BTreeMap<EntityKind, u64>,
    /// The expanded selection the reset operated on
    pub entities: Vec<EntityKind>,
    /// Whether baseline state was reseeded
    pub seeded: bool,
}

/// Resets selections of the entity store
pub struct Resetter {
    graph: Arc<EntityGraph>,
    store: Arc<dyn EntityStore>,
}

impl Resetter {
    /// Create a resetter over a store
    #[must_use]
    pub fn new(graph: Arc<EntityGraph>, store: Arc<dyn EntityStore>) -> Self {
        Self { graph, store }
    }

    /// Destructively reset the expanded selection
    ///
    /// The caller observes either full success with accurate counts or
    /// an error with no partial deletion.
    ///
    /// # Errors
    /// Fails on invalid selections, cancellation, and store failures;
    /// the transaction rolls back in every failure case, including a
    /// failed reseed.
    pub async fn reset(
        &self,
        selection: &Selection,
        ctx: &OpContext,
    ) -> Result<ResetReport, EngineError> {
        validate_selection(&self.graph, selection)?;
        let expanded = self.graph.expand(selection);
        let entities: Vec<EntityKind> = self
            .graph
            .dependency_order()
            .iter()
            .copied()
            .filter(|kind| expanded.contains(*kind))
            .collect();

        let full = self.graph.is_full_closure(&expanded);
        let seed_users = full || expanded.contains(EntityKind::User);
        let seed_policies = full || expanded.contains(EntityKind::RolePolicy);
        // The administrator references the baseline tenant, so seeding
        // users implies seeding the tenant as well.
        let seed_tenant = seed_users || expanded.contains(EntityKind::Tenant);
        let seeded = seed_tenant || seed_policies;

        let mut tx = self.store.begin().await?;
        let phases = PhasePlan {
            graph: &self.graph,
            expanded: &expanded,
            seed_tenant,
            seed_users,
            seed_policies,
        };
        match phases.apply(tx.as_mut(), ctx).await {
            Ok(deleted) => {
                tx.commit().await?;
                tracing::info!(kinds = entities.len(), seeded, "reset committed");
                Ok(ResetReport {
                    deleted,
                    entities,
                    seeded,
                })
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

/// The four reset phases over one open transaction
struct PhasePlan<'a> {
    graph: &'a EntityGraph,
    expanded: &'a Selection,
    seed_tenant: bool,
    seed_users: bool,
    seed_policies: bool,
}

impl PhasePlan<'_> {
    async fn apply(
        &self,
        tx: &mut (dyn EntityTransaction + '_),
        ctx: &OpContext,
    ) -> Result<BTreeMap<EntityKind, u64>, EngineError> {
        self.detach(tx, ctx).await?;
        self.clear_dependents(tx, ctx).await?;
        let deleted = self.delete(tx, ctx).await?;
        self.reseed(tx, ctx).await?;
        Ok(deleted)
    }

    /// Null out nullable references held by kinds that survive the reset
    async fn detach(
        &self,
        tx: &mut (dyn EntityTransaction + '_),
        ctx: &OpContext,
    ) -> Result<(), EngineError> {
        for desc in self.graph.descriptors() {
            if self.expanded.contains(desc.kind) {
                continue;
            }
            for edge in &desc.edges {
                if edge.nullable && self.expanded.contains(edge.target) {
                    ctx.checkpoint()?;
                    let cleared = tx.clear_reference(desc.kind, edge.field).await?;
                    if cleared > 0 {
                        tracing::debug!(
                            kind = %desc.kind,
                            field = %edge.field,
                            cleared,
                            "detached surviving references"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Purge internal records owned by a selected kind
    async fn clear_dependents(
        &self,
        tx: &mut (dyn EntityTransaction + '_),
        ctx: &OpContext,
    ) -> Result<(), EngineError> {
        for kind in self.graph.internal_kinds() {
            let owner_selected = self
                .graph
                .edges(kind)
                .iter()
                .any(|edge| self.expanded.contains(edge.target));
            if owner_selected {
                ctx.checkpoint()?;
                tx.delete_all(kind).await?;
            }
        }
        Ok(())
    }

    /// Delete selected kinds, most-dependent first
    async fn delete(
        &self,
        tx: &mut (dyn EntityTransaction + '_),
        ctx: &OpContext,
    ) -> Result<BTreeMap<EntityKind, u64>, EngineError> {
        let mut deleted = BTreeMap::new();
        for kind in self.graph.reverse_order() {
            if self.expanded.contains(*kind) {
                ctx.checkpoint()?;
                deleted.insert(*kind, tx.delete_all(*kind).await?);
            }
        }
        Ok(deleted)
    }

    /// Recreate baseline state removed by the selection
    async fn reseed(
        &self,
        tx: &mut (dyn EntityTransaction + '_),
        ctx: &OpContext,
    ) -> Result<(), EngineError> {
        if self.seed_tenant {
            seed::upsert_baseline_tenant(tx, ctx).await?;
        }
        if self.seed_users {
            seed::upsert_admin_user(tx, ctx).await?;
        }
        if self.seed_policies {
            seed::upsert_role_policies(tx, ctx).await?;
        }
        Ok(())
    }
}
