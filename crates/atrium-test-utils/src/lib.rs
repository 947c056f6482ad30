//! Testing utilities for the Atrium workspace
//!
//! Shared fixtures: a registry handle and a populated in-memory store
//! holding a small tenant hierarchy with content, a user and a live
//! session.

#![allow(missing_docs)]

use atrium_domain::{
    Category, Document, EntityGraph, Link, Role, Sector, Session, Tag, TagLink, Tenant, Unit, User,
};
use atrium_store::MemoryStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Identities of the records seeded by [`populated_store`]
#[derive(Debug, Clone)]
pub struct SampleData {
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub sector_id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub link_id: Uuid,
    pub document_id: Uuid,
    pub tag_id: Uuid,
}

pub fn fixture_graph() -> Arc<EntityGraph> {
    Arc::new(EntityGraph::new())
}

/// An empty store over a fresh registry
pub fn empty_store() -> MemoryStore {
    MemoryStore::new(fixture_graph())
}

/// A store holding a small, referentially valid tenant hierarchy
pub async fn populated_store() -> (MemoryStore, SampleData) {
    let store = empty_store();

    let tenant = Tenant::new("Acme");
    let unit = Unit::new(tenant.id, "Operations");
    let sector = Sector::new(tenant.id, unit.id, "Logistics");
    let user = User::new("casey@acme.test", "Casey", "$argon2id$fixture", Role::Member)
        .with_tenant(tenant.id)
        .with_unit(unit.id)
        .with_sector(sector.id);
    let category = Category::new(tenant.id, "HR");
    let link = Link::new("Handbook", "https://acme.test/handbook")
        .with_category(category.id)
        .with_sector(sector.id)
        .with_user(user.id);
    let document = Document::new("Org chart", "application/pdf").with_category(category.id);
    let tag = Tag::new(tenant.id, "onboarding");
    let tag_link = TagLink {
        tag_id: tag.id,
        link_id: link.id,
    };
    let session = Session::new(user.id, "token-hash", Utc::now() + Duration::hours(8));

    let sample = SampleData {
        tenant_id: tenant.id,
        unit_id: unit.id,
        sector_id: sector.id,
        user_id: user.id,
        category_id: category.id,
        link_id: link.id,
        document_id: document.id,
        tag_id: tag.id,
    };

    store
        .seed([
            tenant.into(),
            unit.into(),
            sector.into(),
            user.into(),
            category.into(),
            link.into(),
            document.into(),
            tag.into(),
            tag_link.into(),
            session.into(),
        ])
        .await
        .expect("fixture data is referentially valid");

    (store, sample)
}
