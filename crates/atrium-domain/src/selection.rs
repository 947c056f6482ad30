//! Selection sets and closure expansion
//!
//! A [`Selection`] is the transient set of entity kinds an operation
//! targets. Expansion computes the minimal closed superset: the rule
//! table on [`EntityGraph`] is applied until a fixpoint, so adding a new
//! kind to the schema cannot silently skip a closure rule.

use crate::entities::EntityKind;
use crate::graph::EntityGraph;
use std::collections::BTreeSet;

/// A caller-supplied set of entity kinds targeted by an operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection(BTreeSet<EntityKind>);

impl Selection {
    /// Empty selection
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no kinds are selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether a kind is selected
    #[must_use]
    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0.contains(&kind)
    }

    /// Add a kind
    pub fn insert(&mut self, kind: EntityKind) -> bool {
        self.0.insert(kind)
    }

    /// Selected kinds in registry-stable order
    pub fn iter(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.0.iter().copied()
    }

    /// Selected kinds as a vector
    #[must_use]
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<EntityKind> for Selection {
    fn from_iter<I: IntoIterator<Item = EntityKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[EntityKind; N]> for Selection {
    fn from(kinds: [EntityKind; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl EntityGraph {
    /// Compute the referentially-safe closure of a selection
    ///
    /// Applies the registry's expansion rules until nothing changes.
    /// Total and monotonic: the result is always a superset of the
    /// input, and an empty selection stays empty.
    #[must_use]
    pub fn expand(&self, selection: &Selection) -> Selection {
        let mut set = selection.0.clone();
        loop {
            let before = set.len();
            for rule in &self.rules {
                if set.contains(&rule.when) {
                    set.extend(rule.add.iter().copied());
                }
            }
            if set.len() == before {
                return Selection(set);
            }
        }
    }

    /// Whether an already-expanded selection covers the whole registry
    ///
    /// The full closure triggers baseline-reseed eligibility even when
    /// users or role policies were not explicitly named.
    #[must_use]
    pub fn is_full_closure(&self, expanded: &Selection) -> bool {
        self.dependency_order()
            .iter()
            .all(|kind| expanded.contains(*kind))
    }

    /// Selection covering every selectable kind
    #[must_use]
    pub fn full_selection(&self) -> Selection {
        self.dependency_order().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_stays_empty() {
        let graph = EntityGraph::new();
        assert!(graph.expand(&Selection::empty()).is_empty());
    }

    #[test]
    fn tenant_pulls_its_content_tree() {
        let graph = EntityGraph::new();
        let expanded = graph.expand(&Selection::from([EntityKind::Tenant]));
        for kind in [
            EntityKind::Tenant,
            EntityKind::Unit,
            EntityKind::Sector,
            EntityKind::Category,
            EntityKind::Link,
            EntityKind::Document,
            EntityKind::Tag,
            EntityKind::TagLink,
        ] {
            assert!(expanded.contains(kind), "missing {kind}");
        }
        assert!(!expanded.contains(EntityKind::User));
        assert!(!expanded.contains(EntityKind::RolePolicy));
    }

    #[test]
    fn unit_pulls_sectors() {
        let graph = EntityGraph::new();
        let expanded = graph.expand(&Selection::from([EntityKind::Unit]));
        assert_eq!(
            expanded.kinds(),
            vec![EntityKind::Unit, EntityKind::Sector]
        );
    }

    #[test]
    fn tag_and_link_each_pull_tag_links() {
        let graph = EntityGraph::new();
        for kind in [EntityKind::Tag, EntityKind::Link] {
            let expanded = graph.expand(&Selection::from([kind]));
            assert!(expanded.contains(EntityKind::TagLink));
        }
    }

    #[test]
    fn categories_expand_to_themselves() {
        let graph = EntityGraph::new();
        let expanded = graph.expand(&Selection::from([EntityKind::Category]));
        assert_eq!(expanded.kinds(), vec![EntityKind::Category]);
    }

    #[test]
    fn full_closure_detection() {
        let graph = EntityGraph::new();
        let full = graph.full_selection();
        assert!(graph.is_full_closure(&graph.expand(&full)));

        let partial = graph.expand(&Selection::from([EntityKind::Tenant]));
        assert!(!graph.is_full_closure(&partial));
    }
}
