use async_trait::async_trait;
use atrium_domain::{
    Category, EntityKind, FkField, Record, RecordKey, Role, Selection, Tenant,
};
use atrium_engine::{
    seed, Archive, ArchiveMeta, CancelHandle, EngineError, Exporter, OpContext, Resetter,
    RestoreMode, Restorer, ARCHIVE_VERSION,
};
use atrium_store::{EntityStore, EntityTransaction, MemoryStore, StoreError, UpsertOutcome};
use atrium_test_utils::{empty_store, populated_store};
use chrono::Utc;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

fn exporter(store: &MemoryStore) -> Exporter {
    Exporter::new(Arc::clone(store.graph()), Arc::new(store.clone()))
}

fn restorer(store: &MemoryStore) -> Restorer {
    Restorer::new(Arc::clone(store.graph()), Arc::new(store.clone()))
}

fn resetter(store: &MemoryStore) -> Resetter {
    Resetter::new(Arc::clone(store.graph()), Arc::new(store.clone()))
}

async fn dump(store: &MemoryStore) -> BTreeMap<EntityKind, Vec<Record>> {
    let mut state = BTreeMap::new();
    for kind in store.graph().dependency_order() {
        state.insert(*kind, store.find_all(*kind).await.unwrap());
    }
    state
}

// -- export ----------------------------------------------------------------

#[tokio::test]
async fn export_stamps_meta_with_expanded_selection() {
    let (store, _) = populated_store().await;
    let archive = exporter(&store)
        .export(&Selection::from([EntityKind::Unit]), &OpContext::unbounded())
        .await
        .unwrap();

    assert_eq!(archive.meta.version, ARCHIVE_VERSION);
    assert_eq!(
        archive.meta.entities,
        vec![EntityKind::Unit, EntityKind::Sector]
    );
    assert_eq!(archive.data[&EntityKind::Unit].len(), 1);
    assert_eq!(archive.data[&EntityKind::Sector].len(), 1);
}

#[tokio::test]
async fn export_never_includes_sessions() {
    let (store, _) = populated_store().await;
    let archive = exporter(&store)
        .export(&store.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap();

    assert!(!archive.meta.entities.contains(&EntityKind::Session));
    assert!(!archive.data.contains_key(&EntityKind::Session));
}

#[tokio::test]
async fn export_rejects_internal_kinds() {
    let (store, _) = populated_store().await;
    let err = exporter(&store)
        .export(
            &Selection::from([EntityKind::Session]),
            &OpContext::unbounded(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSelection(_)));
}

#[tokio::test]
async fn export_fails_closed_on_read_errors() {
    let (store, _) = populated_store().await;
    let failing = FailingStore::new(store).fail_find(EntityKind::Link);
    let exporter = Exporter::new(
        Arc::clone(failing.inner.graph()),
        Arc::new(failing),
    );
    let err = exporter
        .export(
            &Selection::from([EntityKind::Link]),
            &OpContext::unbounded(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
}

// -- restore ---------------------------------------------------------------

#[tokio::test]
async fn round_trip_preserves_state() {
    let (store, _) = populated_store().await;
    let selection = store.graph().full_selection();
    let before = dump(&store).await;

    let archive = exporter(&store)
        .export(&selection, &OpContext::unbounded())
        .await
        .unwrap();
    restorer(&store)
        .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
        .await
        .unwrap();

    assert_eq!(dump(&store).await, before);
}

#[tokio::test]
async fn restore_is_idempotent() {
    let (source, _) = populated_store().await;
    let archive = exporter(&source)
        .export(&source.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap();

    let target = empty_store();
    let restorer = restorer(&target);
    let first = restorer
        .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
        .await
        .unwrap();
    let state_after_first = dump(&target).await;
    let second = restorer
        .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(dump(&target).await, state_after_first);
}

#[tokio::test]
async fn merge_restore_of_a_single_category() {
    let store = empty_store();
    let tenant = Tenant::new("Acme");
    let category = Category::new(tenant.id, "HR");
    store.seed([Record::Tenant(tenant)]).await.unwrap();

    let archive = Archive {
        meta: ArchiveMeta {
            version: ARCHIVE_VERSION,
            created_at: Utc::now(),
            entities: vec![EntityKind::Category],
        },
        data: BTreeMap::from([(
            EntityKind::Category,
            vec![Record::Category(category.clone()).to_value().unwrap()],
        )]),
    };

    let restorer = restorer(&store);
    for _ in 0..2 {
        let report = restorer
            .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
            .await
            .unwrap();
        assert_eq!(report.restored, BTreeMap::from([(EntityKind::Category, 1)]));
        assert!(report.skipped.is_empty());
    }

    let categories = store.find_all(EntityKind::Category).await.unwrap();
    assert_eq!(categories, vec![Record::Category(category)]);
}

#[tokio::test]
async fn restore_overwrites_non_key_fields() {
    let (store, sample) = populated_store().await;
    let archive = exporter(&store)
        .export(
            &Selection::from([EntityKind::Category]),
            &OpContext::unbounded(),
        )
        .await
        .unwrap();

    // Rename the category after the export; restore must bring the
    // archived name back under the same identity.
    let mut tx = store.begin().await.unwrap();
    let mut renamed = None;
    for record in tx.find_all(EntityKind::Category).await.unwrap() {
        if let Record::Category(mut c) = record {
            c.name = "Renamed".to_string();
            renamed = Some(c.clone());
            tx.upsert(Record::Category(c)).await.unwrap();
        }
    }
    tx.commit().await.unwrap();
    assert!(renamed.is_some());

    restorer(&store)
        .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
        .await
        .unwrap();

    let categories = store.find_all(EntityKind::Category).await.unwrap();
    match &categories[..] {
        [Record::Category(c)] => {
            assert_eq!(c.id, sample.category_id);
            assert_eq!(c.name, "HR");
        }
        other => panic!("unexpected categories: {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_mode_is_an_observable_noop() {
    let (store, _) = populated_store().await;
    let before = dump(&store).await;
    let archive = exporter(&store)
        .export(&store.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap();

    let report = restorer(&store)
        .restore(
            &archive,
            None,
            &RestoreMode::parse("replace"),
            &OpContext::unbounded(),
        )
        .await
        .unwrap();

    assert!(report.restored.is_empty());
    assert_eq!(report.skipped, archive.meta.entities);
    assert_eq!(dump(&store).await, before);
}

#[tokio::test]
async fn unknown_archive_version_is_rejected_before_writes() {
    let (store, _) = populated_store().await;
    let before = dump(&store).await;
    let mut archive = exporter(&store)
        .export(&store.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap();
    archive.meta.version = 2;

    let err = restorer(&store)
        .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnsupportedVersion(2)));
    assert_eq!(dump(&store).await, before);
}

#[tokio::test]
async fn malformed_payload_is_rejected_before_writes() {
    let (store, _) = populated_store().await;
    let before = dump(&store).await;
    let archive = Archive {
        meta: ArchiveMeta {
            version: ARCHIVE_VERSION,
            created_at: Utc::now(),
            entities: vec![EntityKind::Category],
        },
        data: BTreeMap::from([(
            EntityKind::Category,
            vec![serde_json::json!({ "bogus": true })],
        )]),
    };

    let err = restorer(&store)
        .restore(&archive, None, &RestoreMode::Merge, &OpContext::unbounded())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::MalformedRecord {
            kind: EntityKind::Category,
            ..
        }
    ));
    assert_eq!(dump(&store).await, before);
}

#[tokio::test]
async fn restore_honors_explicit_selection_over_meta() {
    let (source, _) = populated_store().await;
    let archive = exporter(&source)
        .export(&source.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap();

    let target = empty_store();
    let report = restorer(&target)
        .restore(
            &archive,
            Some(&Selection::from([EntityKind::Tenant])),
            &RestoreMode::Merge,
            &OpContext::unbounded(),
        )
        .await
        .unwrap();

    assert_eq!(report.restored.keys().copied().collect::<Vec<_>>(), vec![
        EntityKind::Tenant
    ]);
    assert_eq!(target.count(EntityKind::User).unwrap(), 0);
}

#[tokio::test]
async fn cancelled_restore_leaves_store_unchanged() {
    let (source, _) = populated_store().await;
    let archive = exporter(&source)
        .export(&source.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap();

    let target = empty_store();
    let handle = CancelHandle::new();
    handle.cancel();
    let ctx = OpContext::unbounded().with_cancel(handle);

    let err = restorer(&target)
        .restore(&archive, None, &RestoreMode::Merge, &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
    for kind in target.graph().dependency_order() {
        assert_eq!(target.count(*kind).unwrap(), 0, "writes leaked for {kind}");
    }
}

// -- reset -----------------------------------------------------------------

#[tokio::test]
async fn cascading_tenant_reset_reseeds_the_pinned_baseline() {
    let (store, sample) = populated_store().await;
    let report = resetter(&store)
        .reset(&Selection::from([EntityKind::Tenant]), &OpContext::unbounded())
        .await
        .unwrap();

    let expected: BTreeMap<EntityKind, u64> = [
        (EntityKind::Tenant, 1),
        (EntityKind::Unit, 1),
        (EntityKind::Sector, 1),
        (EntityKind::Category, 1),
        (EntityKind::Link, 1),
        (EntityKind::Document, 1),
        (EntityKind::Tag, 1),
        (EntityKind::TagLink, 1),
    ]
    .into();
    assert_eq!(report.deleted, expected);
    assert!(report.seeded);

    // The old tenant is gone; the baseline tenant sits at its pinned id.
    let tenants = store.find_all(EntityKind::Tenant).await.unwrap();
    match &tenants[..] {
        [Record::Tenant(t)] => {
            assert_eq!(t.id, seed::BASELINE_TENANT_ID);
            assert_ne!(t.id, sample.tenant_id);
        }
        other => panic!("unexpected tenants: {other:?}"),
    }

    // Users survive with their hierarchy references detached.
    let users = store.find_all(EntityKind::User).await.unwrap();
    match &users[..] {
        [Record::User(u)] => {
            assert_eq!(u.id, sample.user_id);
            assert_eq!(u.tenant_id, None);
            assert_eq!(u.unit_id, None);
            assert_eq!(u.sector_id, None);
        }
        other => panic!("unexpected users: {other:?}"),
    }
}

#[tokio::test]
async fn detach_before_delete_keeps_links_alive() {
    let (store, sample) = populated_store().await;
    let report = resetter(&store)
        .reset(
            &Selection::from([EntityKind::Category]),
            &OpContext::unbounded(),
        )
        .await
        .unwrap();

    assert_eq!(report.deleted, BTreeMap::from([(EntityKind::Category, 1)]));
    assert!(!report.seeded);

    let links = store.find_all(EntityKind::Link).await.unwrap();
    match &links[..] {
        [Record::Link(link)] => {
            assert_eq!(link.id, sample.link_id);
            assert_eq!(link.category_id, None);
            assert_eq!(link.sector_id, Some(sample.sector_id));
        }
        other => panic!("unexpected links: {other:?}"),
    }
}

#[tokio::test]
async fn user_reset_purges_sessions_and_reseeds_admin() {
    let (store, _) = populated_store().await;
    assert_eq!(store.count(EntityKind::Session).unwrap(), 1);

    let report = resetter(&store)
        .reset(&Selection::from([EntityKind::User]), &OpContext::unbounded())
        .await
        .unwrap();

    assert_eq!(report.deleted, BTreeMap::from([(EntityKind::User, 1)]));
    assert!(report.seeded);
    assert_eq!(store.count(EntityKind::Session).unwrap(), 0);

    let users = store.find_all(EntityKind::User).await.unwrap();
    match &users[..] {
        [Record::User(admin)] => {
            assert_eq!(admin.id, seed::BASELINE_ADMIN_ID);
            assert_eq!(admin.role, Role::SuperAdmin);
            assert_eq!(admin.tenant_id, Some(seed::BASELINE_TENANT_ID));
            assert!(admin.password_hash.starts_with("$argon2"));
        }
        other => panic!("unexpected users: {other:?}"),
    }
}

#[tokio::test]
async fn full_reset_leaves_the_system_operable() {
    let (store, _) = populated_store().await;
    let full = store.graph().full_selection();
    let report = resetter(&store)
        .reset(&full, &OpContext::unbounded())
        .await
        .unwrap();

    assert!(report.seeded);
    let entities: Selection = report.entities.iter().copied().collect();
    assert_eq!(entities, full);

    let policies = store.find_all(EntityKind::RolePolicy).await.unwrap();
    for role in Role::ALL {
        assert!(
            policies
                .iter()
                .any(|p| p.key() == RecordKey::Role(role)),
            "missing policy for {role}"
        );
    }
    assert_eq!(store.count(EntityKind::User).unwrap(), 1);
    assert_eq!(store.count(EntityKind::Tenant).unwrap(), 1);
}

#[tokio::test]
async fn reset_without_users_or_policies_does_not_seed() {
    let (store, _) = populated_store().await;
    let report = resetter(&store)
        .reset(&Selection::from([EntityKind::Link]), &OpContext::unbounded())
        .await
        .unwrap();

    assert!(!report.seeded);
    assert_eq!(
        report.entities,
        vec![EntityKind::Link, EntityKind::TagLink]
    );
    assert_eq!(store.count(EntityKind::User).unwrap(), 1);
}

#[tokio::test]
async fn reset_never_leaves_dangling_references() {
    let (store, _) = populated_store().await;
    resetter(&store)
        .reset(
            &Selection::from([EntityKind::Sector, EntityKind::Category]),
            &OpContext::unbounded(),
        )
        .await
        .unwrap();

    // A follow-up no-op transaction revalidates the whole store.
    let tx = store.begin().await.unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn failed_reset_rolls_back_everything() {
    let (store, _) = populated_store().await;
    let before = dump(&store).await;
    let failing = FailingStore::new(store.clone()).fail_delete(EntityKind::Link);
    let resetter = Resetter::new(Arc::clone(store.graph()), Arc::new(failing));

    let err = resetter
        .reset(&store.graph().full_selection(), &OpContext::unbounded())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Store(StoreError::Unavailable(_))));
    assert_eq!(dump(&store).await, before);
    assert_eq!(store.count(EntityKind::Session).unwrap(), 1);
}

// -- failing store double --------------------------------------------------

struct FailingStore {
    inner: MemoryStore,
    fail_find: Option<EntityKind>,
    fail_delete: Option<EntityKind>,
}

impl FailingStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_find: None,
            fail_delete: None,
        }
    }

    fn fail_find(mut self, kind: EntityKind) -> Self {
        self.fail_find = Some(kind);
        self
    }

    fn fail_delete(mut self, kind: EntityKind) -> Self {
        self.fail_delete = Some(kind);
        self
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn find_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        if self.fail_find == Some(kind) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        self.inner.find_all(kind).await
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, StoreError> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            fail_delete: self.fail_delete,
        }))
    }
}

struct FailingTransaction {
    inner: Box<dyn EntityTransaction>,
    fail_delete: Option<EntityKind>,
}

#[async_trait]
impl EntityTransaction for FailingTransaction {
    async fn find_all(&mut self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        self.inner.find_all(kind).await
    }

    async fn upsert(&mut self, record: Record) -> Result<UpsertOutcome, StoreError> {
        self.inner.upsert(record).await
    }

    async fn delete_all(&mut self, kind: EntityKind) -> Result<u64, StoreError> {
        if self.fail_delete == Some(kind) {
            return Err(StoreError::Unavailable(
                "injected delete failure".to_string(),
            ));
        }
        self.inner.delete_all(kind).await
    }

    async fn clear_reference(
        &mut self,
        kind: EntityKind,
        field: FkField,
    ) -> Result<u64, StoreError> {
        self.inner.clear_reference(kind, field).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let FailingTransaction { inner, .. } = *self;
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let FailingTransaction { inner, .. } = *self;
        inner.rollback().await
    }
}
