//! Baseline state seeding
//!
//! The minimum state the portal needs to stay operable: the root tenant,
//! one administrator account and the default role policies. Identities
//! are pinned to well-known values so reseeding is deterministic across
//! resets and restarts; downstream code may reference them.

use crate::context::OpContext;
use crate::error::EngineError;
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use atrium_domain::{EntityStatus, Role, RolePolicy, Tenant, User};
use atrium_store::{EntityStore, EntityTransaction};
use chrono::Utc;
use uuid::{uuid, Uuid};

/// Pinned identity of the root tenant
pub const BASELINE_TENANT_ID: Uuid = uuid!("00000000-0000-4000-8000-000000000001");

/// Pinned identity of the reseeded administrator account
pub const BASELINE_ADMIN_ID: Uuid = uuid!("00000000-0000-4000-8000-000000000002");

/// Display name of the root tenant
pub const BASELINE_TENANT_NAME: &str = "Atrium";

const ADMIN_EMAIL_ENV: &str = "ATRIUM_ADMIN_EMAIL";
const ADMIN_PASSWORD_ENV: &str = "ATRIUM_ADMIN_PASSWORD";
const DEFAULT_ADMIN_EMAIL: &str = "admin@atrium.local";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Default capability flags for every defined role
#[must_use]
pub fn default_role_policies() -> Vec<RolePolicy> {
    Role::ALL
        .into_iter()
        .map(|role| match role {
            Role::Member => RolePolicy {
                role,
                can_view_dashboard: false,
                can_access_admin: false,
                can_manage_users: false,
                can_manage_units: false,
                can_manage_categories: false,
                can_manage_content: true,
                can_view_private_content: false,
                can_export_backups: false,
                can_restore_backups: false,
                can_reset_system: false,
                restrict_to_own_sector: true,
            },
            Role::Admin | Role::SuperAdmin => RolePolicy {
                role,
                can_view_dashboard: true,
                can_access_admin: true,
                can_manage_users: true,
                can_manage_units: true,
                can_manage_categories: true,
                can_manage_content: true,
                can_view_private_content: true,
                can_export_backups: true,
                can_restore_backups: true,
                can_reset_system: true,
                restrict_to_own_sector: false,
            },
        })
        .collect()
}

/// Hash a credential with Argon2id and a fresh salt
fn hash_credential(password: &str) -> Result<String, EngineError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::Credential(err.to_string()))
}

pub(crate) async fn upsert_baseline_tenant(
    tx: &mut (dyn EntityTransaction + '_),
    ctx: &OpContext,
) -> Result<(), EngineError> {
    ctx.checkpoint()?;
    tx.upsert(
        Tenant {
            id: BASELINE_TENANT_ID,
            name: BASELINE_TENANT_NAME.to_string(),
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
        .into(),
    )
    .await?;
    Ok(())
}

pub(crate) async fn upsert_admin_user(
    tx: &mut (dyn EntityTransaction + '_),
    ctx: &OpContext,
) -> Result<(), EngineError> {
    let email =
        std::env::var(ADMIN_EMAIL_ENV).unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
    let password =
        std::env::var(ADMIN_PASSWORD_ENV).unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
    let password_hash = hash_credential(&password)?;

    ctx.checkpoint()?;
    tx.upsert(
        User {
            id: BASELINE_ADMIN_ID,
            email,
            name: "Administrator".to_string(),
            password_hash,
            role: Role::SuperAdmin,
            status: EntityStatus::Active,
            tenant_id: Some(BASELINE_TENANT_ID),
            unit_id: None,
            sector_id: None,
            created_at: Utc::now(),
        }
        .into(),
    )
    .await?;
    Ok(())
}

pub(crate) async fn upsert_role_policies(
    tx: &mut (dyn EntityTransaction + '_),
    ctx: &OpContext,
) -> Result<(), EngineError> {
    for policy in default_role_policies() {
        ctx.checkpoint()?;
        tx.upsert(policy.into()).await?;
    }
    Ok(())
}

/// Seed the full baseline into a store, in one transaction
///
/// Used at process bootstrap; every upsert is idempotent by pinned
/// identity, so running it against an already-seeded store is a no-op
/// apart from refreshing the administrator credential hash.
///
/// # Errors
/// Fails on store errors or credential-hashing failures; nothing is
/// applied in that case.
pub async fn seed_baseline(store: &dyn EntityStore, ctx: &OpContext) -> Result<(), EngineError> {
    let mut tx = store.begin().await?;
    let outcome = async {
        upsert_baseline_tenant(tx.as_mut(), ctx).await?;
        upsert_admin_user(tx.as_mut(), ctx).await?;
        upsert_role_policies(tx.as_mut(), ctx).await?;
        Ok(())
    }
    .await;
    match outcome {
        Ok(()) => {
            tx.commit().await?;
            tracing::info!("baseline state seeded");
            Ok(())
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}
