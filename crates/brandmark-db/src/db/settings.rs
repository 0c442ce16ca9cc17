use async_trait::async_trait;
use brandmark_core::models::{SettingsChanges, SettingsRecord};
use brandmark_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::TransactionGuard;

/// Outcome of an atomic settings write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsCommit {
    /// The record as committed (or as found, when nothing changed)
    pub record: SettingsRecord,
    /// Logo key that the write replaced, if the logo changed
    pub superseded_logo_key: Option<String>,
    /// False when the changes were already in effect and nothing was written
    pub changed: bool,
}

impl SettingsCommit {
    pub(crate) fn compute(current: &SettingsRecord, next: SettingsRecord, changed: bool) -> Self {
        let superseded_logo_key = if changed && next.logo_object_key != current.logo_object_key {
            current.logo_object_key.clone()
        } else {
            None
        };
        Self {
            record: next,
            superseded_logo_key,
            changed,
        }
    }
}

/// Storage of organization branding settings.
///
/// `apply_changes` is the only write path. Implementations serialize concurrent
/// writers for the same owner so that the last committed write wins and each write
/// sees the record left by the previous one.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Current settings, or `None` if the organization never saved any.
    async fn get(&self, owner_id: Uuid) -> Result<Option<SettingsRecord>, AppError>;

    /// Apply `changes` atomically. When they are already in effect the record is
    /// returned unchanged, without a version bump.
    async fn apply_changes(
        &self,
        owner_id: Uuid,
        changes: &SettingsChanges,
    ) -> Result<SettingsCommit, AppError>;
}

const SELECT_COLUMNS: &str = "owner_id, public_name, website, description, brand_color, \
     show_stats_in_job_descriptions, logo_object_key, version, updated_at";

/// Postgres-backed settings repository
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    #[tracing::instrument(skip(self), fields(db.table = "organization_settings", db.operation = "select"))]
    async fn get(&self, owner_id: Uuid) -> Result<Option<SettingsRecord>, AppError> {
        let record = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {} FROM organization_settings WHERE owner_id = $1",
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "organization_settings", db.operation = "update"))]
    async fn apply_changes(
        &self,
        owner_id: Uuid,
        changes: &SettingsChanges,
    ) -> Result<SettingsCommit, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "apply_settings_changes").await?;

        // Make sure a row exists so the lock below always has something to hold.
        sqlx::query(
            r#"
            INSERT INTO organization_settings (owner_id)
            VALUES ($1)
            ON CONFLICT (owner_id) DO NOTHING
            "#,
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;

        let current = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {} FROM organization_settings WHERE owner_id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_one(&mut **tx)
        .await?;

        if changes.is_noop_for(&current) {
            tx.commit().await?;
            return Ok(SettingsCommit::compute(&current, current.clone(), false));
        }

        let next = changes.apply_to(&current);
        let committed = sqlx::query_as::<_, SettingsRecord>(&format!(
            r#"
            UPDATE organization_settings
            SET public_name = $2,
                website = $3,
                description = $4,
                brand_color = $5,
                show_stats_in_job_descriptions = $6,
                logo_object_key = $7,
                version = version + 1,
                updated_at = NOW()
            WHERE owner_id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .bind(&next.public_name)
        .bind(&next.website)
        .bind(&next.description)
        .bind(&next.brand_color)
        .bind(next.show_stats_in_job_descriptions)
        .bind(&next.logo_object_key)
        .fetch_one(&mut **tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            owner_id = %owner_id,
            version = committed.version,
            "Settings committed"
        );

        Ok(SettingsCommit::compute(&current, committed, true))
    }
}
