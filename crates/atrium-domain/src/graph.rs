//! Entity Graph Registry
//!
//! Static declaration of the known entity kinds, their foreign-key edges
//! and the deletion-safe topological order. Constructed once at process
//! start and injected into every component that needs it; pure data, no
//! behavior beyond lookups.
//!
//! The dependency order is maintained by hand next to the edge
//! declarations and must stay consistent with them; the consistency is a
//! tested invariant (`order_respects_every_edge` in the crate tests).

use crate::entities::{EntityKind, FkField};
use std::collections::BTreeMap;

/// Directed foreign-key relationship between two entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FkEdge {
    /// Field on the dependent record holding the reference
    pub field: FkField,
    /// Kind the field points at
    pub target: EntityKind,
    /// Whether the field may be nulled while the record survives
    pub nullable: bool,
}

impl FkEdge {
    const fn required(field: FkField, target: EntityKind) -> Self {
        Self {
            field,
            target,
            nullable: false,
        }
    }

    const fn nullable(field: FkField, target: EntityKind) -> Self {
        Self {
            field,
            target,
            nullable: true,
        }
    }
}

/// Registry entry for one entity kind
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// The kind described
    pub kind: EntityKind,
    /// Has no mandatory parent
    pub root: bool,
    /// Engine-internal kind, never selectable or archived
    pub internal: bool,
    /// Outgoing foreign-key edges
    pub edges: Vec<FkEdge>,
}

/// Closure rule: selecting `when` pulls in every kind in `add`
#[derive(Debug, Clone)]
pub(crate) struct ExpansionRule {
    pub(crate) when: EntityKind,
    pub(crate) add: Vec<EntityKind>,
}

/// Immutable registry of entity kinds, edges and orderings
#[derive(Debug)]
pub struct EntityGraph {
    descriptors: BTreeMap<EntityKind, EntityDescriptor>,
    order: Vec<EntityKind>,
    reverse: Vec<EntityKind>,
    pub(crate) rules: Vec<ExpansionRule>,
}

impl EntityGraph {
    /// Build the registry for the portal schema
    #[must_use]
    pub fn new() -> Self {
        let descriptors = [
            EntityDescriptor {
                kind: EntityKind::Tenant,
                root: true,
                internal: false,
                edges: Vec::new(),
            },
            EntityDescriptor {
                kind: EntityKind::RolePolicy,
                root: true,
                internal: false,
                edges: Vec::new(),
            },
            EntityDescriptor {
                kind: EntityKind::Unit,
                root: false,
                internal: false,
                edges: vec![FkEdge::required(FkField::TenantId, EntityKind::Tenant)],
            },
            EntityDescriptor {
                kind: EntityKind::Sector,
                root: false,
                internal: false,
                edges: vec![
                    FkEdge::required(FkField::TenantId, EntityKind::Tenant),
                    FkEdge::required(FkField::UnitId, EntityKind::Unit),
                ],
            },
            EntityDescriptor {
                kind: EntityKind::User,
                root: false,
                internal: false,
                edges: vec![
                    FkEdge::nullable(FkField::TenantId, EntityKind::Tenant),
                    FkEdge::nullable(FkField::UnitId, EntityKind::Unit),
                    FkEdge::nullable(FkField::SectorId, EntityKind::Sector),
                ],
            },
            EntityDescriptor {
                kind: EntityKind::Category,
                root: false,
                internal: false,
                edges: vec![FkEdge::required(FkField::TenantId, EntityKind::Tenant)],
            },
            EntityDescriptor {
                kind: EntityKind::Tag,
                root: false,
                internal: false,
                edges: vec![FkEdge::required(FkField::TenantId, EntityKind::Tenant)],
            },
            EntityDescriptor {
                kind: EntityKind::Link,
                root: false,
                internal: false,
                edges: vec![
                    FkEdge::nullable(FkField::CategoryId, EntityKind::Category),
                    FkEdge::nullable(FkField::SectorId, EntityKind::Sector),
                    FkEdge::nullable(FkField::UserId, EntityKind::User),
                ],
            },
            EntityDescriptor {
                kind: EntityKind::Document,
                root: false,
                internal: false,
                edges: vec![
                    FkEdge::nullable(FkField::CategoryId, EntityKind::Category),
                    FkEdge::nullable(FkField::SectorId, EntityKind::Sector),
                    FkEdge::nullable(FkField::UserId, EntityKind::User),
                ],
            },
            EntityDescriptor {
                kind: EntityKind::TagLink,
                root: false,
                internal: false,
                edges: vec![
                    FkEdge::required(FkField::TagId, EntityKind::Tag),
                    FkEdge::required(FkField::LinkId, EntityKind::Link),
                ],
            },
            EntityDescriptor {
                kind: EntityKind::Session,
                root: false,
                internal: true,
                edges: vec![FkEdge::required(FkField::UserId, EntityKind::User)],
            },
        ];

        // Parents before dependents; deletion uses the reverse.
        let order = vec![
            EntityKind::Tenant,
            EntityKind::RolePolicy,
            EntityKind::Unit,
            EntityKind::Sector,
            EntityKind::User,
            EntityKind::Category,
            EntityKind::Tag,
            EntityKind::Link,
            EntityKind::Document,
            EntityKind::TagLink,
        ];
        let reverse = order.iter().rev().copied().collect();

        let rules = vec![
            // A tenant owns its whole content tree.
            ExpansionRule {
                when: EntityKind::Tenant,
                add: vec![
                    EntityKind::Unit,
                    EntityKind::Sector,
                    EntityKind::Category,
                    EntityKind::Link,
                    EntityKind::Document,
                    EntityKind::Tag,
                    EntityKind::TagLink,
                ],
            },
            // Sectors cannot exist without their unit.
            ExpansionRule {
                when: EntityKind::Unit,
                add: vec![EntityKind::Sector],
            },
            // Tag-links cannot exist without either side of the pair.
            ExpansionRule {
                when: EntityKind::Link,
                add: vec![EntityKind::TagLink],
            },
            ExpansionRule {
                when: EntityKind::Tag,
                add: vec![EntityKind::TagLink],
            },
        ];

        Self {
            descriptors: descriptors.into_iter().map(|d| (d.kind, d)).collect(),
            order,
            reverse,
            rules,
        }
    }

    /// Descriptor for a kind
    #[must_use]
    pub fn descriptor(&self, kind: EntityKind) -> Option<&EntityDescriptor> {
        self.descriptors.get(&kind)
    }

    /// Outgoing foreign-key edges of a kind
    #[must_use]
    pub fn edges(&self, kind: EntityKind) -> &[FkEdge] {
        self.descriptors
            .get(&kind)
            .map_or(&[], |d| d.edges.as_slice())
    }

    /// Target kind of one foreign-key field, if declared
    #[must_use]
    pub fn edge_target(&self, kind: EntityKind, field: FkField) -> Option<EntityKind> {
        self.edges(kind)
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.target)
    }

    /// Restore-safe order: parents before dependents
    #[must_use]
    pub fn dependency_order(&self) -> &[EntityKind] {
        &self.order
    }

    /// Deletion-safe order: most-dependent kinds first
    #[must_use]
    pub fn reverse_order(&self) -> &[EntityKind] {
        &self.reverse
    }

    /// All descriptors, including internal kinds
    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.values()
    }

    /// Whether a kind may appear in a selection or archive
    #[must_use]
    pub fn is_selectable(&self, kind: EntityKind) -> bool {
        self.descriptors
            .get(&kind)
            .is_some_and(|d| !d.internal)
    }

    /// Engine-internal kinds (purged by reset, never archived)
    pub fn internal_kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.descriptors
            .values()
            .filter(|d| d.internal)
            .map(|d| d.kind)
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_selectable_kind_is_ordered_once() {
        let graph = EntityGraph::new();
        let order = graph.dependency_order();
        for desc in graph.descriptors() {
            let occurrences = order.iter().filter(|k| **k == desc.kind).count();
            let expected = usize::from(!desc.internal);
            assert_eq!(occurrences, expected, "kind {} misplaced", desc.kind);
        }
    }

    #[test]
    fn order_respects_every_edge() {
        let graph = EntityGraph::new();
        let position = |kind: EntityKind| {
            graph
                .dependency_order()
                .iter()
                .position(|k| *k == kind)
        };
        for desc in graph.descriptors().filter(|d| !d.internal) {
            let Some(dependent) = position(desc.kind) else {
                panic!("kind {} missing from order", desc.kind)
            };
            for edge in &desc.edges {
                let parent = position(edge.target)
                    .unwrap_or_else(|| panic!("target {} missing from order", edge.target));
                assert!(
                    parent < dependent,
                    "{} must come before {}",
                    edge.target,
                    desc.kind
                );
            }
        }
    }

    #[test]
    fn reverse_order_is_exact_mirror() {
        let graph = EntityGraph::new();
        let mut mirrored: Vec<_> = graph.reverse_order().to_vec();
        mirrored.reverse();
        assert_eq!(mirrored, graph.dependency_order());
    }

    #[test]
    fn session_is_internal_only() {
        let graph = EntityGraph::new();
        assert!(!graph.is_selectable(EntityKind::Session));
        assert_eq!(
            graph.internal_kinds().collect::<Vec<_>>(),
            vec![EntityKind::Session]
        );
    }

    #[test]
    fn edge_target_lookup() {
        let graph = EntityGraph::new();
        assert_eq!(
            graph.edge_target(EntityKind::Link, FkField::CategoryId),
            Some(EntityKind::Category)
        );
        assert_eq!(graph.edge_target(EntityKind::Tenant, FkField::TenantId), None);
    }
}
