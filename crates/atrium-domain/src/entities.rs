//! Domain records for the Atrium content portal
//!
//! Defines the entity kinds the backup engine operates on:
//! - Selectable kinds (tenant hierarchy, users, policies, content)
//! - The internal `session` kind, purged alongside users but never
//!   exported, restored or selectable
//! - Typed records with identity keys and foreign-key accessors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named kind of domain record known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Root organization (a customer of the portal)
    Tenant,
    /// Organizational unit inside a tenant
    Unit,
    /// Sub-unit inside a unit
    Sector,
    /// Portal account
    User,
    /// Capability flags for one role, keyed by role name
    RolePolicy,
    /// Content category inside a tenant
    Category,
    /// Shared link
    Link,
    /// Uploaded document
    Document,
    /// Content tag inside a tenant
    Tag,
    /// Tag-to-link association, keyed by (tag, link)
    TagLink,
    /// Login session artifact; internal, not selectable
    Session,
}

impl EntityKind {
    /// Stable string form, matching the serde representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Tenant => "tenant",
            EntityKind::Unit => "unit",
            EntityKind::Sector => "sector",
            EntityKind::User => "user",
            EntityKind::RolePolicy => "role-policy",
            EntityKind::Category => "category",
            EntityKind::Link => "link",
            EntityKind::Document => "document",
            EntityKind::Tag => "tag",
            EntityKind::TagLink => "tag-link",
            EntityKind::Session => "session",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Foreign-key field on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FkField {
    /// Reference to the owning tenant
    TenantId,
    /// Reference to the owning unit
    UnitId,
    /// Reference to the owning sector
    SectorId,
    /// Reference to the owning user
    UserId,
    /// Reference to a category
    CategoryId,
    /// Reference to a link
    LinkId,
    /// Reference to a tag
    TagId,
}

impl FkField {
    /// Field name as it appears in serialized records
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FkField::TenantId => "tenant_id",
            FkField::UnitId => "unit_id",
            FkField::SectorId => "sector_id",
            FkField::UserId => "user_id",
            FkField::CategoryId => "category_id",
            FkField::LinkId => "link_id",
            FkField::TagId => "tag_id",
        }
    }
}

impl std::fmt::Display for FkField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Regular portal member
    Member,
    /// Tenant administrator
    Admin,
    /// Cross-tenant super administrator
    SuperAdmin,
}

impl Role {
    /// All defined roles, in policy-seeding order
    pub const ALL: [Role; 3] = [Role::Member, Role::Admin, Role::SuperAdmin];

    /// Stable string form, matching the serde representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::SuperAdmin => "super-admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activation state shared by several records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityStatus {
    /// Visible and usable
    Active,
    /// Retained but disabled
    Inactive,
}

/// Identity key of a record
///
/// Most kinds are keyed by a UUID. Role policies are keyed by role name
/// and tag-links by the (tag, link) pair; restore and upsert go through
/// this key so those kinds never grow a synthetic id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    /// UUID identity
    Id(Uuid),
    /// Role-name identity (role policies)
    Role(Role),
    /// Composite identity (tag-links)
    Pair(Uuid, Uuid),
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{id}"),
            RecordKey::Role(role) => write!(f, "{role}"),
            RecordKey::Pair(a, b) => write!(f, "{a}:{b}"),
        }
    }
}

/// Root organization record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Identity key
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Activation state
    pub status: EntityStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Create an active tenant with a fresh identity
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Organizational unit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Identity key
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Unit {
    /// Create a unit under a tenant
    #[must_use]
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Sub-unit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    /// Identity key
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Owning unit
    pub unit_id: Uuid,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Sector {
    /// Create a sector under a unit
    #[must_use]
    pub fn new(tenant_id: Uuid, unit_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            unit_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Portal account record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity key
    pub id: Uuid,
    /// Login email, unique
    pub email: String,
    /// Display name
    pub name: String,
    /// Argon2 password hash
    pub password_hash: String,
    /// Assigned role
    pub role: Role,
    /// Activation state
    pub status: EntityStatus,
    /// Owning tenant, if assigned
    pub tenant_id: Option<Uuid>,
    /// Owning unit, if assigned
    pub unit_id: Option<Uuid>,
    /// Owning sector, if assigned
    pub sector_id: Option<Uuid>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create an active, unassigned user
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            role,
            status: EntityStatus::Active,
            tenant_id: None,
            unit_id: None,
            sector_id: None,
            created_at: Utc::now(),
        }
    }

    /// Assign to a tenant
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Assign to a unit
    #[must_use]
    pub fn with_unit(mut self, unit_id: Uuid) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    /// Assign to a sector
    #[must_use]
    pub fn with_sector(mut self, sector_id: Uuid) -> Self {
        self.sector_id = Some(sector_id);
        self
    }
}

/// Capability flags for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// Role this policy applies to; identity key
    pub role: Role,
    /// May open the admin dashboard
    pub can_view_dashboard: bool,
    /// May enter the admin area
    pub can_access_admin: bool,
    /// May create, edit and delete users
    pub can_manage_users: bool,
    /// May manage units and sectors
    pub can_manage_units: bool,
    /// May manage categories and tags
    pub can_manage_categories: bool,
    /// May manage links and documents
    pub can_manage_content: bool,
    /// May see content marked private
    pub can_view_private_content: bool,
    /// May export backup archives
    pub can_export_backups: bool,
    /// May restore backup archives
    pub can_restore_backups: bool,
    /// May run destructive resets
    pub can_reset_system: bool,
    /// Content visibility limited to the user's own sector
    pub restrict_to_own_sector: bool,
}

/// Shared link record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Identity key
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Target URL
    pub url: String,
    /// Category, if filed
    pub category_id: Option<Uuid>,
    /// Sector scope, if any
    pub sector_id: Option<Uuid>,
    /// Owning user, if any
    pub user_id: Option<Uuid>,
    /// Hidden from users without private-content access
    pub private: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Create a public, unfiled link
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            url: url.into(),
            category_id: None,
            sector_id: None,
            user_id: None,
            private: false,
            created_at: Utc::now(),
        }
    }

    /// File under a category
    #[must_use]
    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Scope to a sector
    #[must_use]
    pub fn with_sector(mut self, sector_id: Uuid) -> Self {
        self.sector_id = Some(sector_id);
        self
    }

    /// Attribute to a user
    #[must_use]
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Content category record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Identity key
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a category under a tenant
    #[must_use]
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Uploaded document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identity key
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// MIME type of the stored payload
    pub media_type: String,
    /// Category, if filed
    pub category_id: Option<Uuid>,
    /// Sector scope, if any
    pub sector_id: Option<Uuid>,
    /// Uploading user, if known
    pub user_id: Option<Uuid>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create an unfiled document
    #[must_use]
    pub fn new(title: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            media_type: media_type.into(),
            category_id: None,
            sector_id: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    /// File under a category
    #[must_use]
    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Content tag record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Identity key
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Tag label
    pub label: String,
}

impl Tag {
    /// Create a tag under a tenant
    #[must_use]
    pub fn new(tenant_id: Uuid, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            label: label.into(),
        }
    }
}

/// Tag-to-link association, keyed by the (tag, link) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLink {
    /// Tag side of the pair
    pub tag_id: Uuid,
    /// Link side of the pair
    pub link_id: Uuid,
}

/// Login session artifact
///
/// Exists only to support a user; never exported or restored. The
/// Resetter purges sessions whenever users are reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Identity key
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Hash of the bearer token
    pub token_hash: String,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for a user
    #[must_use]
    pub fn new(user_id: Uuid, token_hash: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.into(),
            expires_at,
        }
    }
}

/// A record of any entity kind
///
/// Serializes untagged: the archive stores plain per-kind objects, so the
/// kind travels in the archive key, not inside each record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// Tenant record
    Tenant(Tenant),
    /// Unit record
    Unit(Unit),
    /// Sector record
    Sector(Sector),
    /// User record
    User(User),
    /// Role policy record
    RolePolicy(RolePolicy),
    /// Category record
    Category(Category),
    /// Link record
    Link(Link),
    /// Document record
    Document(Document),
    /// Tag record
    Tag(Tag),
    /// Tag-link record
    TagLink(TagLink),
    /// Session record
    Session(Session),
}

impl Record {
    /// Kind of this record
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Tenant(_) => EntityKind::Tenant,
            Record::Unit(_) => EntityKind::Unit,
            Record::Sector(_) => EntityKind::Sector,
            Record::User(_) => EntityKind::User,
            Record::RolePolicy(_) => EntityKind::RolePolicy,
            Record::Category(_) => EntityKind::Category,
            Record::Link(_) => EntityKind::Link,
            Record::Document(_) => EntityKind::Document,
            Record::Tag(_) => EntityKind::Tag,
            Record::TagLink(_) => EntityKind::TagLink,
            Record::Session(_) => EntityKind::Session,
        }
    }

    /// Identity key of this record
    #[must_use]
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Tenant(r) => RecordKey::Id(r.id),
            Record::Unit(r) => RecordKey::Id(r.id),
            Record::Sector(r) => RecordKey::Id(r.id),
            Record::User(r) => RecordKey::Id(r.id),
            Record::RolePolicy(r) => RecordKey::Role(r.role),
            Record::Category(r) => RecordKey::Id(r.id),
            Record::Link(r) => RecordKey::Id(r.id),
            Record::Document(r) => RecordKey::Id(r.id),
            Record::Tag(r) => RecordKey::Id(r.id),
            Record::TagLink(r) => RecordKey::Pair(r.tag_id, r.link_id),
            Record::Session(r) => RecordKey::Id(r.id),
        }
    }

    /// Foreign keys currently set on this record
    #[must_use]
    pub fn foreign_keys(&self) -> Vec<(FkField, Uuid)> {
        let mut keys = Vec::new();
        let mut push = |field: FkField, value: Option<Uuid>| {
            if let Some(id) = value {
                keys.push((field, id));
            }
        };
        match self {
            Record::Tenant(_) | Record::RolePolicy(_) => {}
            Record::Unit(r) => push(FkField::TenantId, Some(r.tenant_id)),
            Record::Sector(r) => {
                push(FkField::TenantId, Some(r.tenant_id));
                push(FkField::UnitId, Some(r.unit_id));
            }
            Record::User(r) => {
                push(FkField::TenantId, r.tenant_id);
                push(FkField::UnitId, r.unit_id);
                push(FkField::SectorId, r.sector_id);
            }
            Record::Category(r) => push(FkField::TenantId, Some(r.tenant_id)),
            Record::Link(r) => {
                push(FkField::CategoryId, r.category_id);
                push(FkField::SectorId, r.sector_id);
                push(FkField::UserId, r.user_id);
            }
            Record::Document(r) => {
                push(FkField::CategoryId, r.category_id);
                push(FkField::SectorId, r.sector_id);
                push(FkField::UserId, r.user_id);
            }
            Record::Tag(r) => push(FkField::TenantId, Some(r.tenant_id)),
            Record::TagLink(r) => {
                push(FkField::TagId, Some(r.tag_id));
                push(FkField::LinkId, Some(r.link_id));
            }
            Record::Session(r) => push(FkField::UserId, Some(r.user_id)),
        }
        keys
    }

    /// Null out a nullable foreign-key field
    ///
    /// Returns `true` when a value was actually cleared. Required fields
    /// cannot be cleared and always return `false`.
    pub fn clear_foreign_key(&mut self, field: FkField) -> bool {
        fn take(slot: &mut Option<Uuid>) -> bool {
            slot.take().is_some()
        }
        match (self, field) {
            (Record::User(r), FkField::TenantId) => take(&mut r.tenant_id),
            (Record::User(r), FkField::UnitId) => take(&mut r.unit_id),
            (Record::User(r), FkField::SectorId) => take(&mut r.sector_id),
            (Record::Link(r), FkField::CategoryId) => take(&mut r.category_id),
            (Record::Link(r), FkField::SectorId) => take(&mut r.sector_id),
            (Record::Link(r), FkField::UserId) => take(&mut r.user_id),
            (Record::Document(r), FkField::CategoryId) => take(&mut r.category_id),
            (Record::Document(r), FkField::SectorId) => take(&mut r.sector_id),
            (Record::Document(r), FkField::UserId) => take(&mut r.user_id),
            _ => false,
        }
    }

    /// Serialize to the plain JSON object stored in archives
    ///
    /// # Errors
    /// Returns the underlying serde error if serialization fails.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Decode an archive value as a record of the given kind
    ///
    /// # Errors
    /// Returns the underlying serde error when the value does not match
    /// the record shape of `kind`.
    pub fn from_value(
        kind: EntityKind,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Tenant => Record::Tenant(serde_json::from_value(value)?),
            EntityKind::Unit => Record::Unit(serde_json::from_value(value)?),
            EntityKind::Sector => Record::Sector(serde_json::from_value(value)?),
            EntityKind::User => Record::User(serde_json::from_value(value)?),
            EntityKind::RolePolicy => Record::RolePolicy(serde_json::from_value(value)?),
            EntityKind::Category => Record::Category(serde_json::from_value(value)?),
            EntityKind::Link => Record::Link(serde_json::from_value(value)?),
            EntityKind::Document => Record::Document(serde_json::from_value(value)?),
            EntityKind::Tag => Record::Tag(serde_json::from_value(value)?),
            EntityKind::TagLink => Record::TagLink(serde_json::from_value(value)?),
            EntityKind::Session => Record::Session(serde_json::from_value(value)?),
        })
    }
}

macro_rules! impl_from_record {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Record {
            fn from(value: $ty) -> Self {
                Record::$variant(value)
            }
        })*
    };
}

impl_from_record! {
    Tenant => Tenant,
    Unit => Unit,
    Sector => Sector,
    User => User,
    RolePolicy => RolePolicy,
    Category => Category,
    Link => Link,
    Document => Document,
    Tag => Tag,
    TagLink => TagLink,
    Session => Session,
}
